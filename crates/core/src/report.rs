use crate::pattern::Extraction;
use crate::sanitize::DestinationError;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    PatternMismatch,
    NonUnicodeName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PatternMismatch => f.write_str("パターンに一致しません"),
            SkipReason::NonUnicodeName => f.write_str("ファイル名がUTF-8ではありません"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileFailure {
    #[error("移動先に同名のファイルが既に存在します: {}", path.display())]
    DestinationConflict { path: PathBuf },
    #[error("移動先がフォルダではありません: {}", path.display())]
    DestinationNotADirectory { path: PathBuf },
    #[error("アクセスが拒否されました: {}", path.display())]
    PermissionDenied { path: PathBuf },
    #[error("移動先フォルダ名が不正です ({rendered}): {reason}")]
    InvalidDestination {
        rendered: String,
        reason: DestinationError,
    },
    #[error("ファイル操作に失敗しました: {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl FileFailure {
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            return FileFailure::PermissionDenied {
                path: path.to_path_buf(),
            };
        }
        FileFailure::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Moved {
        destination: PathBuf,
        components: Extraction,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        reason: FileFailure,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_name: String,
    pub source_path: PathBuf,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct OrganizeStats {
    pub scanned_entries: usize,
    pub files: usize,
    pub skipped_directories: usize,
    pub skipped_other: usize,
    pub matched: usize,
    pub skipped: usize,
    pub moved: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganizeReport {
    pub source_dir: PathBuf,
    pub entries: Vec<FileReport>,
    pub stats: OrganizeStats,
}

impl OrganizeReport {
    pub fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileReport, &FileFailure)> + '_ {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            Outcome::Failed { reason } => Some((entry, reason)),
            _ => None,
        })
    }

    pub fn outcome_for(&self, file_name: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|entry| entry.file_name == file_name)
            .map(|entry| &entry.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_errors_are_classified() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        let failure = FileFailure::from_io(Path::new("/tmp/a.jpg"), err);
        assert_eq!(
            failure,
            FileFailure::PermissionDenied {
                path: PathBuf::from("/tmp/a.jpg")
            }
        );

        let err = io::Error::other("disk on fire");
        let failure = FileFailure::from_io(Path::new("/tmp/a.jpg"), err);
        assert!(matches!(failure, FileFailure::Io { ref message, .. } if message.contains("disk on fire")));
    }

    #[test]
    fn report_serializes_outcome_tags() {
        let report = OrganizeReport {
            source_dir: PathBuf::from("/photos"),
            entries: vec![
                FileReport {
                    file_name: "a.txt".to_string(),
                    source_path: PathBuf::from("/photos/a.txt"),
                    outcome: Outcome::Skipped {
                        reason: SkipReason::PatternMismatch,
                    },
                },
                FileReport {
                    file_name: "20230101.jpg".to_string(),
                    source_path: PathBuf::from("/photos/20230101.jpg"),
                    outcome: Outcome::Failed {
                        reason: FileFailure::DestinationConflict {
                            path: PathBuf::from("/photos/2023/20230101.jpg"),
                        },
                    },
                },
            ],
            stats: OrganizeStats {
                failed: 1,
                ..OrganizeStats::default()
            },
        };

        let json = serde_json::to_value(&report).expect("must serialize");
        assert_eq!(json["entries"][0]["outcome"]["status"], "skipped");
        assert_eq!(json["entries"][0]["outcome"]["reason"], "pattern_mismatch");
        assert_eq!(json["entries"][1]["outcome"]["reason"]["kind"], "destination_conflict");
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);
    }
}
