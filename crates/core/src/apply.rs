use crate::pattern::Matcher;
use crate::planner::{plan_organize, OrganizeError, OrganizePlan, PlanAction, PlannedEntry};
use crate::report::{FileFailure, FileReport, OrganizeReport, Outcome};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ApplyOptions {
    pub parallel: bool,
}

type FolderResults = HashMap<PathBuf, Result<(), FileFailure>>;

pub fn organize(
    source_dir: &Path,
    naming_template: &str,
    matcher: &Matcher,
) -> Result<OrganizeReport, OrganizeError> {
    organize_with_options(source_dir, naming_template, matcher, &ApplyOptions::default())
}

pub fn organize_with_options(
    source_dir: &Path,
    naming_template: &str,
    matcher: &Matcher,
    options: &ApplyOptions,
) -> Result<OrganizeReport, OrganizeError> {
    let plan = plan_organize(source_dir, naming_template, matcher)?;
    Ok(apply_plan_with_options(&plan, options))
}

pub fn apply_plan(plan: &OrganizePlan) -> OrganizeReport {
    apply_plan_with_options(plan, &ApplyOptions::default())
}

/// Executes a plan. A failing file never stops the pass; every entry gets an
/// outcome in plan order. Files already moved stay moved if the process is
/// interrupted.
pub fn apply_plan_with_options(plan: &OrganizePlan, options: &ApplyOptions) -> OrganizeReport {
    // folders are always created one at a time, even when moves run in parallel
    let folders = prepare_folders(plan);

    let outcomes: Vec<Outcome> = if options.parallel {
        plan.entries
            .par_iter()
            .map(|entry| apply_entry(entry, &folders))
            .collect()
    } else {
        plan.entries
            .iter()
            .map(|entry| apply_entry(entry, &folders))
            .collect()
    };

    let mut stats = plan.stats.clone();
    let mut entries = Vec::with_capacity(outcomes.len());
    for (entry, outcome) in plan.entries.iter().zip(outcomes) {
        match &outcome {
            Outcome::Moved { .. } => stats.moved += 1,
            Outcome::Failed { reason } => {
                warn!(file = %entry.file_name, "{reason}");
                stats.failed += 1;
            }
            Outcome::Skipped { .. } => {}
        }
        entries.push(FileReport {
            file_name: entry.file_name.clone(),
            source_path: entry.source_path.clone(),
            outcome,
        });
    }

    OrganizeReport {
        source_dir: plan.source_dir.clone(),
        entries,
        stats,
    }
}

fn prepare_folders(plan: &OrganizePlan) -> FolderResults {
    let mut folders = FolderResults::new();
    for entry in &plan.entries {
        if let PlanAction::Move {
            destination_dir, ..
        } = &entry.action
        {
            if folders.contains_key(destination_dir) {
                continue;
            }
            let result = ensure_folder(destination_dir, &plan.source_dir);
            folders.insert(destination_dir.clone(), result);
        }
    }
    folders
}

fn apply_entry(entry: &PlannedEntry, folders: &FolderResults) -> Outcome {
    match &entry.action {
        PlanAction::Skip { reason } => Outcome::Skipped { reason: *reason },
        PlanAction::Reject { reason } => Outcome::Failed {
            reason: reason.clone(),
        },
        PlanAction::Move {
            destination_dir,
            components,
        } => {
            if let Some(Err(reason)) = folders.get(destination_dir) {
                return Outcome::Failed {
                    reason: reason.clone(),
                };
            }
            let target = destination_dir.join(&entry.file_name);
            match move_no_clobber(&entry.source_path, &target) {
                Ok(()) => {
                    info!(
                        from = %entry.source_path.display(),
                        to = %target.display(),
                        "移動しました"
                    );
                    Outcome::Moved {
                        destination: target,
                        components: components.clone(),
                    }
                }
                Err(reason) => Outcome::Failed { reason },
            }
        }
    }
}

/// Creates `dir` and any missing parents. An existing directory is fine; an
/// existing file anywhere on the way is reported as the blocker.
fn ensure_folder(dir: &Path, root: &Path) -> Result<(), FileFailure> {
    let Err(err) = fs::create_dir_all(dir) else {
        return Ok(());
    };

    let blocker = dir
        .ancestors()
        .take_while(|p| *p != root && p.starts_with(root))
        .find(|p| fs::metadata(p).map(|m| !m.is_dir()).unwrap_or(false));
    if let Some(path) = blocker {
        return Err(FileFailure::DestinationNotADirectory {
            path: path.to_path_buf(),
        });
    }
    Err(FileFailure::from_io(dir, err))
}

/// Moves `source` to `target` without ever replacing an existing `target`.
///
/// A hard link is tried first since it fails atomically when the name is
/// taken. Filesystems without hard links fall back to a checked rename, and
/// moves across volumes copy through a temporary file next to `target`.
fn move_no_clobber(source: &Path, target: &Path) -> Result<(), FileFailure> {
    match fs::hard_link(source, target) {
        Ok(()) => {
            if let Err(err) = fs::remove_file(source) {
                discard(target);
                return Err(FileFailure::from_io(source, err));
            }
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(FileFailure::DestinationConflict {
                path: target.to_path_buf(),
            })
        }
        Err(err) => {
            debug!(error = %err, "ハードリンク不可のため rename にフォールバック");
            rename_if_absent(source, target)
        }
    }
}

fn rename_if_absent(source: &Path, target: &Path) -> Result<(), FileFailure> {
    if fs::symlink_metadata(target).is_ok() {
        return Err(FileFailure::DestinationConflict {
            path: target.to_path_buf(),
        });
    }
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device(&err) => copy_across_volumes(source, target),
        Err(err) => Err(FileFailure::from_io(source, err)),
    }
}

fn copy_across_volumes(source: &Path, target: &Path) -> Result<(), FileFailure> {
    let temp = temp_path_for(target);
    fs::copy(source, &temp).map_err(|err| {
        discard(&temp);
        FileFailure::from_io(target, err)
    })?;

    let published = match fs::hard_link(&temp, target) {
        Ok(()) => {
            discard(&temp);
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(FileFailure::DestinationConflict {
                path: target.to_path_buf(),
            })
        }
        Err(_) if fs::symlink_metadata(target).is_ok() => Err(FileFailure::DestinationConflict {
            path: target.to_path_buf(),
        }),
        Err(_) => fs::rename(&temp, target).map_err(|err| FileFailure::from_io(target, err)),
    };
    if let Err(reason) = published {
        discard(&temp);
        return Err(reason);
    }

    if let Err(err) = fs::remove_file(source) {
        discard(target);
        return Err(FileFailure::from_io(source, err));
    }
    Ok(())
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "後片付けに失敗しました");
        }
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV on Unix, ERROR_NOT_SAME_DEVICE on Windows
    let code = if cfg!(windows) { 17 } else { 18 };
    err.raw_os_error() == Some(code)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let file_name = target
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    parent.join(format!(
        ".datesort_tmp_{}_{}_{}",
        std::process::id(),
        now,
        file_name
    ))
}
