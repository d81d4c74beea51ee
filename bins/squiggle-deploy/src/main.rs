//! squiggle-deploy: compile the Squiggle token distribution into a
//! deployment plan.
//!
//! The plan is printed or written as JSON for an external execution engine.
//! Nothing here talks to a chain.

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use squiggle_core::constants::BuildMode;
use squiggle_core::table::{parse_table, table_to_json, AllocationSpec};
use squiggle_core::tokenomics::squiggle_table;
use squiggle_core::types::Address;
use squiggle_core::units::Units;
use squiggle_plan::{
    check_supply, plan_distribution, plan_table, CompiledPlan, Operation, SupplyReport,
};
use tracing::info;

use crate::config::Config;

/// Squiggle distribution planner.
#[derive(Parser, Debug)]
#[command(name = "squiggle-deploy", version, about = "Compile the Squiggle deployment plan")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile the deployment plan.
    Plan(PlanArgs),
    /// Validate the table against the total supply and print the report.
    Supply(SupplyArgs),
    /// Dump the built-in allocation table as JSON.
    Table(TableArgs),
}

#[derive(Args, Debug)]
struct PlanArgs {
    /// JSON allocation table (default: built-in Squiggle table).
    #[arg(long)]
    table: Option<PathBuf>,

    /// Write the plan here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Bind to the existing payment asset regardless of NODE_ENV.
    #[arg(long)]
    production: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct SupplyArgs {
    /// JSON allocation table (default: built-in Squiggle table).
    #[arg(long)]
    table: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Write the table here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = Config::from_env().context("invalid environment")?;

    match cli.command {
        Commands::Plan(args) => run_plan(config, args),
        Commands::Supply(args) => run_supply(&config, args),
        Commands::Table(args) => run_table(&config, args),
    }
}

fn run_plan(config: Config, args: PlanArgs) -> Result<()> {
    let config = if args.production {
        config.with_mode(BuildMode::Production)
    } else {
        config
    };
    info!(mode = config.mode.as_str(), "planning deployment");

    let plan_config = config.plan_config()?;
    let plan = match args.table.as_deref() {
        Some(path) => plan_table(&Units::default(), &read_table(path)?, &plan_config)
            .with_context(|| format!("failed to plan table: {}", path.display()))?,
        None => {
            let table = squiggle_table(config.cex_address).context("failed to build table")?;
            plan_distribution(&Units::default(), &table, &plan_config)
                .context("failed to compile deployment plan")?
        }
    };
    let fingerprint = plan.fingerprint().context("failed to encode plan")?;
    info!(%fingerprint, "plan compiled");

    let rendered = match args.format {
        OutputFormat::Json => plan.to_json_pretty().context("failed to encode plan")?,
        OutputFormat::Text => render_text(&plan, &fingerprint),
    };
    emit(args.out.as_deref(), &rendered)
}

fn run_supply(config: &Config, args: SupplyArgs) -> Result<()> {
    let table = load_table(args.table.as_deref(), config.cex_address)?;
    let report = check_supply(&Units::default(), &table).context("supply check failed")?;
    println!("{}", render_supply(&report));
    Ok(())
}

fn run_table(config: &Config, args: TableArgs) -> Result<()> {
    let table = squiggle_table(config.cex_address).context("failed to build table")?;
    let json = table_to_json(&table).context("failed to encode table")?;
    emit(args.out.as_deref(), &json)
}

fn load_table(path: Option<&Path>, cex_address: Address) -> Result<Vec<AllocationSpec>> {
    match path {
        Some(path) => {
            let table = parse_table(&read_table(path)?)
                .with_context(|| format!("invalid table: {}", path.display()))?;
            info!(rows = table.len(), path = %path.display(), "loaded table");
            Ok(table)
        }
        None => squiggle_table(cex_address).context("failed to build table"),
    }
}

fn read_table(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read table: {}", path.display()))
}

fn emit(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "written");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn render_supply(report: &SupplyReport) -> String {
    format!(
        "total supply: {}\nallocated:    {}\nremainder:    {}",
        report.total_supply, report.allocated, report.remainder
    )
}

fn render_text(plan: &CompiledPlan, fingerprint: &str) -> String {
    let mut out = Vec::with_capacity(plan.actions().len() + 5);
    for (index, action) in plan.actions().iter().enumerate() {
        let line = match &action.operation {
            Operation::Create { contract, args } => format!(
                "{index:>3}  create  {:<24} {contract} ({} args)",
                action.id.as_str(),
                args.len()
            ),
            Operation::Call {
                target, method, ..
            } => format!(
                "{index:>3}  call    {:<24} {target}.{method}",
                action.id.as_str()
            ),
        };
        out.push(line);
    }
    out.push(String::new());
    out.push(render_supply(plan.supply()));
    out.push(format!("fingerprint:  {fingerprint}"));
    out.join("\n")
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so the plan on stdout stays machine readable.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn plan_flags_parse() {
        let cli = Cli::try_parse_from([
            "squiggle-deploy",
            "--log-level",
            "debug",
            "plan",
            "--production",
            "--format",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Commands::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert!(args.production);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(args.table.is_none());
    }

    #[test]
    fn table_file_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let table = squiggle_table(Address::ZERO).unwrap();
        std::fs::write(&path, table_to_json(&table).unwrap()).unwrap();
        let loaded = load_table(Some(&path), Address::ZERO).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn dumped_table_plans_like_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let table = squiggle_table(Address::ZERO).unwrap();
        std::fs::write(&path, table_to_json(&table).unwrap()).unwrap();

        let config = squiggle_plan::PlanConfig::default();
        let raw = read_table(&path).unwrap();
        let from_file = plan_table(&Units::default(), &raw, &config).unwrap();
        let builtin = plan_distribution(&Units::default(), &table, &config).unwrap();
        assert_eq!(from_file.fingerprint().unwrap(), builtin.fingerprint().unwrap());
    }

    #[test]
    fn missing_table_file_names_path() {
        let err =
            load_table(Some(Path::new("/nonexistent/table.json")), Address::ZERO).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/table.json"));
    }

    #[test]
    fn text_rendering_lists_every_action() {
        let plan = plan_distribution(
            &Units::default(),
            &squiggle_table(Address::ZERO).unwrap(),
            &squiggle_plan::PlanConfig::default(),
        )
        .unwrap();
        let text = render_text(&plan, "abc");
        assert_eq!(text.lines().count(), plan.actions().len() + 5);
        assert!(text.contains("create  squiggle"));
        assert!(text.ends_with("fingerprint:  abc"));
    }
}
