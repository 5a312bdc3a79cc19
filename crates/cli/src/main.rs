use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use datesort_core::{
    app_paths, apply_plan_with_options, compile_pattern, load_config, plan_organize, save_config,
    AppConfig, ApplyOptions, OrganizePlan, OrganizeReport, Outcome, PlanAction,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "datesort")]
#[command(about = "ファイル名に含まれる日時でファイルをフォルダへ振り分けます")]
struct Cli {
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Organize(OrganizeArgs),
    Match(MatchArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Init,
}

#[derive(Debug, Args)]
struct OrganizeArgs {
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    pattern: Option<String>,
    #[arg(long)]
    template: Option<String>,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, default_value_t = false)]
    parallel: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct MatchArgs {
    #[arg(long)]
    pattern: Option<String>,
    #[arg(required = true)]
    names: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Organize(args) => cmd_organize(args),
        Commands::Match(args) => cmd_match(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_organize(args: OrganizeArgs) -> Result<()> {
    let config = load_config()?;
    let pattern = args.pattern.unwrap_or(config.pattern);
    let template = args.template.unwrap_or(config.template);
    debug!(%pattern, %template, input = %args.input.display(), "organize");

    let matcher = compile_pattern(&pattern)?;
    let plan = plan_organize(&args.input, &template, &matcher)?;

    if !args.apply {
        match args.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            OutputFormat::Table => print_plan(&plan),
        }
        eprintln!("dry-runモード: 実ファイルは移動していません。移動するには --apply を指定してください。");
        return Ok(());
    }

    let options = ApplyOptions {
        parallel: args.parallel || config.parallel,
    };
    let report = apply_plan_with_options(&plan, &options);

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_report(&report),
    }

    eprintln!(
        "完了: 移動 {}件 / スキップ {}件 / 失敗 {}件",
        report.stats.moved, report.stats.skipped, report.stats.failed
    );
    if report.has_failures() {
        anyhow::bail!("{}件のファイルを移動できませんでした", report.stats.failed);
    }

    Ok(())
}

fn cmd_match(args: MatchArgs) -> Result<()> {
    let pattern = match args.pattern {
        Some(pattern) => pattern,
        None => load_config()?.pattern,
    };
    let matcher = compile_pattern(&pattern)?;

    println!("パターン: {}", matcher.source());
    for name in &args.names {
        match matcher.extract(name) {
            Some(extraction) => println!("{} -> {}", name, extraction),
            None => println!("{} -> 一致しません", name),
        }
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() {
        anyhow::bail!(
            "設定ファイルは既に存在します: {}",
            paths.config_path.display()
        );
    }
    save_config(&AppConfig::default())?;
    println!("設定ファイルを作成しました: {}", paths.config_path.display());
    Ok(())
}

fn print_plan(plan: &OrganizePlan) {
    println!("元ファイル -> 移動先フォルダ (抽出結果)");
    for entry in &plan.entries {
        match &entry.action {
            PlanAction::Move {
                destination_dir,
                components,
            } => println!(
                "{} -> {} ({})",
                entry.file_name,
                destination_dir.display(),
                components
            ),
            PlanAction::Skip { reason } => println!("{} : スキップ ({})", entry.file_name, reason),
            PlanAction::Reject { reason } => println!("{} : 失敗予定 ({})", entry.file_name, reason),
        }
    }

    println!(
        "\n集計: scanned={} files={} dir_skip={} other_skip={} matched={} skipped={}",
        plan.stats.scanned_entries,
        plan.stats.files,
        plan.stats.skipped_directories,
        plan.stats.skipped_other,
        plan.stats.matched,
        plan.stats.skipped
    );
}

fn print_report(report: &OrganizeReport) {
    println!("元ファイル -> 結果");
    for entry in &report.entries {
        match &entry.outcome {
            Outcome::Moved { destination, .. } => {
                println!("{} -> {}", entry.file_name, destination.display())
            }
            Outcome::Skipped { reason } => println!("{} : スキップ ({})", entry.file_name, reason),
            Outcome::Failed { reason } => println!("{} : 失敗 ({})", entry.file_name, reason),
        }
    }

    println!(
        "\n集計: scanned={} files={} matched={} moved={} skipped={} failed={}",
        report.stats.scanned_entries,
        report.stats.files,
        report.stats.matched,
        report.stats.moved,
        report.stats.skipped,
        report.stats.failed
    );
}
