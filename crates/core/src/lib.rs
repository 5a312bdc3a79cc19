mod apply;
mod config;
mod pattern;
mod planner;
mod report;
mod sanitize;
mod template;

pub const DEFAULT_PATTERN: &str = "yyyymmdd_hhnnss";
pub const DEFAULT_TEMPLATE: &str = "{year}-{month}";

pub use apply::{
    apply_plan, apply_plan_with_options, organize, organize_with_options, ApplyOptions,
};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
};
pub use pattern::{compile_pattern, Component, Extraction, Matcher, PatternError, PatternToken};
pub use planner::{plan_organize, OrganizeError, OrganizePlan, PlanAction, PlannedEntry};
pub use report::{FileFailure, FileReport, OrganizeReport, OrganizeStats, Outcome, SkipReason};
pub use sanitize::{destination_path, DestinationError};
pub use template::{
    parse_template, render_template, validate_template, Field, TemplateError, TemplatePart,
};
