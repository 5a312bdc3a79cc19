use crate::{DEFAULT_PATTERN, DEFAULT_TEMPLATE};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pattern: String,
    pub template: String,
    pub parallel: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            parallel: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "datesort", "datesort")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("設定ファイルを読めませんでした: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw).context("設定ファイルのパースに失敗しました")?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(&paths.config_path, config)
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| {
            format!("設定ディレクトリを作成できませんでした: {}", dir.display())
        })?;
    }
    let body = toml::to_string_pretty(config).context("設定のシリアライズに失敗しました")?;
    fs::write(path, body)
        .with_context(|| format!("設定ファイルを書き込めませんでした: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_config_from(&temp.path().join("config.toml")).expect("must load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pattern, "yyyymmdd_hhnnss");
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "template = \"{year}/{month}\"\n").expect("write");

        let config = load_config_from(&path).expect("must load");
        assert_eq!(config.template, "{year}/{month}");
        assert_eq!(config.pattern, DEFAULT_PATTERN);
        assert!(!config.parallel);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let config = AppConfig {
            pattern: "ddmmyyyy".to_string(),
            template: "{year}".to_string(),
            parallel: true,
        };

        save_config_to(&path, &config).expect("must save");
        assert_eq!(load_config_from(&path).expect("must load"), config);
    }

    #[test]
    fn broken_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "pattern = [").expect("write");
        assert!(load_config_from(&path).is_err());
    }
}
