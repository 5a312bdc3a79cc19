use crate::pattern::{Extraction, Matcher};
use crate::report::{FileFailure, OrganizeStats, SkipReason};
use crate::sanitize::destination_path;
use crate::template::{parse_template, render_template, TemplateError, TemplatePart};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("フォルダが存在しません: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("フォルダではありません: {}", .0.display())]
    SourceNotADirectory(PathBuf),
    #[error("フォルダを読めませんでした: {}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAction {
    Move {
        destination_dir: PathBuf,
        components: Extraction,
    },
    Skip {
        reason: SkipReason,
    },
    Reject {
        reason: FileFailure,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedEntry {
    pub file_name: String,
    pub source_path: PathBuf,
    pub action: PlanAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizePlan {
    pub source_dir: PathBuf,
    pub pattern: String,
    pub template: String,
    pub entries: Vec<PlannedEntry>,
    pub stats: OrganizeStats,
}

impl OrganizePlan {
    pub fn moves(&self) -> impl Iterator<Item = &PlannedEntry> + '_ {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.action, PlanAction::Move { .. }))
    }
}

/// Scans `source_dir` and decides, per regular file, where it would go.
/// Nothing on disk is changed.
pub fn plan_organize(
    source_dir: &Path,
    naming_template: &str,
    matcher: &Matcher,
) -> Result<OrganizePlan, OrganizeError> {
    let parts = parse_template(naming_template)?;
    check_source_dir(source_dir)?;

    let mut stats = OrganizeStats::default();
    let files = collect_files(source_dir, &mut stats)?;

    let mut entries = Vec::with_capacity(files.len());
    for (source_path, file_name) in files {
        let action = plan_entry(source_dir, &parts, matcher, &file_name, &mut stats);
        entries.push(PlannedEntry {
            file_name: file_name.to_string_lossy().to_string(),
            source_path,
            action,
        });
    }

    Ok(OrganizePlan {
        source_dir: source_dir.to_path_buf(),
        pattern: matcher.source().to_string(),
        template: naming_template.to_string(),
        entries,
        stats,
    })
}

fn check_source_dir(source_dir: &Path) -> Result<(), OrganizeError> {
    match fs::metadata(source_dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(OrganizeError::SourceNotADirectory(source_dir.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(OrganizeError::SourceNotFound(source_dir.to_path_buf()))
        }
        Err(source) => Err(OrganizeError::ReadDir {
            path: source_dir.to_path_buf(),
            source,
        }),
    }
}

fn collect_files(
    root: &Path,
    stats: &mut OrganizeStats,
) -> Result<Vec<(PathBuf, OsString)>, OrganizeError> {
    let read_dir_err = |source| OrganizeError::ReadDir {
        path: root.to_path_buf(),
        source,
    };

    let mut out = Vec::new();
    for entry in fs::read_dir(root).map_err(read_dir_err)? {
        let entry = entry.map_err(read_dir_err)?;
        stats.scanned_entries += 1;

        // file_type() does not follow symlinks
        match entry.file_type() {
            Ok(file_type) if file_type.is_dir() => stats.skipped_directories += 1,
            Ok(file_type) if file_type.is_file() => {
                stats.files += 1;
                out.push((entry.path(), entry.file_name()));
            }
            _ => {
                debug!(path = %entry.path().display(), "通常ファイルではないためスキップ");
                stats.skipped_other += 1;
            }
        }
    }
    out.sort_by(|a, b| a.1.cmp(&b.1));

    Ok(out)
}

fn plan_entry(
    source_dir: &Path,
    parts: &[TemplatePart],
    matcher: &Matcher,
    file_name: &OsString,
    stats: &mut OrganizeStats,
) -> PlanAction {
    let Some(name) = file_name.to_str() else {
        stats.skipped += 1;
        return PlanAction::Skip {
            reason: SkipReason::NonUnicodeName,
        };
    };

    let Some(components) = matcher.extract(name) else {
        debug!(file = name, "パターン不一致");
        stats.skipped += 1;
        return PlanAction::Skip {
            reason: SkipReason::PatternMismatch,
        };
    };
    stats.matched += 1;

    let rendered = render_template(parts, &components, name);
    match destination_path(&rendered) {
        Ok(relative) => {
            debug!(file = name, folder = %relative.display(), "移動先を決定");
            PlanAction::Move {
                destination_dir: source_dir.join(relative),
                components,
            }
        }
        Err(reason) => PlanAction::Reject {
            reason: FileFailure::InvalidDestination { rendered, reason },
        },
    }
}
