use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use pkgsweep::{
    config::Config,
    matcher::{MatchMode, Matcher},
    output::{print_result, render, OutputFormat},
    provider::NpmLsProvider,
    scan::Sweep,
    VulnerabilitySpec,
};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "pkgsweep")]
#[command(
    author,
    version,
    about = "Find npm projects that depend on known-compromised package versions"
)]
struct Cli {
    /// Root directory to scan
    root: Option<PathBuf>,

    /// Advisory table (TOML or JSON) to use instead of the built-in list
    #[arg(short, long)]
    advisories: Option<PathBuf>,

    /// Output format (text, json, table)
    #[arg(short, long)]
    format: Option<String>,

    /// How installed versions are compared with listed versions
    #[arg(long, value_enum)]
    mode: Option<MatchMode>,

    /// Skip devDependencies
    #[arg(long)]
    no_dev: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("fatal: {:#}", e);
            eprintln!("Fatal error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "pkgsweep=debug" } else { "pkgsweep=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    if cli.init_config {
        return init_config(&config_path);
    }

    let root = match check_root(
        cli.root.as_deref(),
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    ) {
        Ok(root) => root,
        Err(code) => return Ok(code),
    };

    let config = Config::load_from(&config_path)?;

    let format_str = cli.format.clone().unwrap_or(config.default_format.clone());
    let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

    let spec = match cli.advisories.as_ref().or(config.advisories.as_ref()) {
        Some(path) => VulnerabilitySpec::load(path)?,
        None => VulnerabilitySpec::builtin(),
    };
    let spec = Arc::new(spec);

    let mode = cli.mode.unwrap_or(config.match_mode);
    let include_dev = !cli.no_dev && config.include_dev;
    let matcher = Matcher::new(Arc::clone(&spec))
        .with_mode(mode)
        .with_dev_dependencies(include_dev);

    let mut provider = NpmLsProvider::new(spec.package_names());
    if let Some(program) = &config.npm_command {
        provider = provider.with_program(program);
    }

    let show_progress =
        !cli.no_progress && format == OutputFormat::Text && std::io::stderr().is_terminal();

    let root = std::path::absolute(root)
        .with_context(|| format!("failed to resolve {}", root.display()))?;

    let sweep = Sweep::new(matcher, provider)
        .with_locator(config.locator_options())
        .with_ignore(config.ignore.clone())
        .with_progress(show_progress);

    let result = sweep.run(&root).await;
    info!(
        scanned = result.scanned_projects,
        vulnerable = result.vulnerable_projects.len(),
        matches = result.total_matches(),
        errors = result.errors.len(),
        "scan finished"
    );

    match cli.output {
        Some(path) => {
            let rendered = render(&result, format)?;
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("Results written to: {}", path.display());
        }
        None => print_result(&result, format)?,
    }

    Ok(exit_codes::SUCCESS)
}

/// Validates the root argument, printing usage to `out` when it is missing
/// and an error to `err` when it is not a directory.
fn check_root<'a>(
    root: Option<&'a Path>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> std::result::Result<&'a Path, u8> {
    let Some(root) = root else {
        let mut command = Cli::command();
        let _ = writeln!(out, "{}", command.render_usage());
        let _ = writeln!(out, "Example: pkgsweep ./my-projects");
        return Err(exit_codes::ERROR);
    };

    if !root.is_dir() {
        let _ = writeln!(err, "Error: Directory '{}' does not exist", root.display());
        return Err(exit_codes::ERROR);
    }

    Ok(root)
}

fn init_config(path: &Path) -> Result<u8> {
    if path.exists() {
        println!("Config file already exists at: {}", path.display());
        return Ok(exit_codes::SUCCESS);
    }

    Config::default().save_to(path)?;
    println!("Created config file at: {}", path.display());
    println!();
    println!("Default configuration:");
    println!("{}", Config::generate_default_config());
    Ok(exit_codes::SUCCESS)
}
