use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationError {
    #[error("フォルダ名が空になりました")]
    Empty,
    #[error("親フォルダ (..) を含むフォルダ名は使用できません")]
    ParentTraversal,
}

/// Turns a rendered folder name into a path relative to the source folder.
///
/// `/` and `\` split nested folders. Empty and `.` segments are dropped, so a
/// missing component never produces an empty folder level.
pub fn destination_path(rendered: &str) -> Result<PathBuf, DestinationError> {
    let mut path = PathBuf::new();
    for segment in rendered.split(['/', '\\']) {
        let segment = segment.trim();
        if segment == ".." {
            return Err(DestinationError::ParentTraversal);
        }
        if segment.is_empty() || segment == "." {
            continue;
        }
        let cleaned = sanitize_segment(segment);
        if !cleaned.is_empty() {
            path.push(cleaned);
        }
    }

    if path.as_os_str().is_empty() {
        return Err(DestinationError::Empty);
    }
    Ok(path)
}

fn sanitize_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if is_disallowed_char(ch) {
            out.push('_');
        } else {
            out.push(ch);
        }
    }

    let mut out = out.trim_end_matches([' ', '.']).trim().to_string();
    if is_windows_reserved(&out) {
        out.push_str("_dir");
    }
    out
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, ':' | '*' | '?' | '"' | '<' | '>' | '|') || ch == '\0' || ch.is_control()
}

fn is_windows_reserved(value: &str) -> bool {
    let stem = value
        .split('.')
        .next()
        .unwrap_or(value)
        .to_ascii_uppercase();
    WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| reserved == &stem)
}
