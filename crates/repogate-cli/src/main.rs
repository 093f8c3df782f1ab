//! repogate - collaboration workflow compliance gate
//!
//! The `repogate` command checks that a repository's collaboration artifacts
//! follow a configured checklist.
//!
//! ## Commands
//!
//! - `check`: Run the compliance pipeline against the remote repository
//! - `config`: Print a built-in checklist as TOML
//! - `table`: Parse the document table of a local Markdown file
//!
//! Exit status is 0 when the command succeeded (for `check`, when every
//! compliance check passed) and 1 otherwise.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, Level};

use repogate_core::{
    init_tracing, parse_table, ComplianceConfig, CompliancePipeline, Credentials, GithubClient,
    Preset, ReportFormat,
};

#[derive(Parser, Debug)]
#[command(name = "repogate")]
#[command(author = "Stevedores Org")]
#[command(version = repogate_core::VERSION)]
#[command(about = "Collaboration workflow compliance gate", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the repository against a compliance checklist
    Check {
        /// Checklist file (TOML)
        #[arg(short, long, env = "REPOGATE_CONFIG", conflicts_with = "preset")]
        config: Option<PathBuf>,

        /// Built-in checklist to use when no file is given
        #[arg(short, long, value_enum)]
        preset: Option<PresetArg>,

        /// Override the repository name from the checklist
        #[arg(long)]
        repo: Option<String>,

        /// Dotenv file holding GITHUB_TOKEN and GITHUB_ORG (default: ./.env)
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Override the API base URL
        #[arg(long)]
        api_base: Option<String>,

        /// Override the per-request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: FormatArg,
    },

    /// Print a built-in checklist as TOML
    Config {
        /// Checklist to print
        #[arg(short, long, value_enum, default_value = "workflow")]
        preset: PresetArg,
    },

    /// Parse the document table of a local Markdown file
    Table {
        /// Markdown file to parse
        file: PathBuf,

        /// Header line that opens the table
        #[arg(long)]
        header: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    /// CI/CD workflow documentation
    Workflow,
    /// Label color standardization
    Labels,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Workflow => Preset::Workflow,
            PresetArg::Labels => Preset::Labels,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

/// Settings that override values of the loaded checklist.
#[derive(Debug, Default)]
struct Overrides {
    repo: Option<String>,
    api_base: Option<String>,
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version land here too and are not failures
            let code = if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = err.print();
            return code;
        }
    };

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let outcome = run(cli.command).await;
    if let Err(err) = &outcome {
        error!(error = %format!("{:#}", err), "repogate failed");
        eprintln!("Error: {:#}", err);
    }
    exit_code(&outcome)
}

/// 0 only for a command that ran and reached a positive verdict.
fn exit_code(outcome: &Result<bool>) -> ExitCode {
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) | Err(_) => ExitCode::FAILURE,
    }
}

/// Dispatch a subcommand; `Ok(false)` means it ran but the verdict is negative.
async fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Check {
            config,
            preset,
            repo,
            env_file,
            api_base,
            timeout_secs,
            format,
        } => {
            let overrides = Overrides {
                repo,
                api_base,
                timeout_secs,
            };
            cmd_check(
                config.as_deref(),
                preset,
                &overrides,
                env_file.as_deref(),
                format.into(),
            )
            .await
        }
        Commands::Config { preset } => cmd_config(preset),
        Commands::Table { file, header } => cmd_table(&file, &header),
    }
}

/// Load the checklist from a file, or fall back to a preset (default: workflow).
fn load_config(path: Option<&Path>, preset: Option<PresetArg>) -> Result<ComplianceConfig> {
    match path {
        Some(path) => ComplianceConfig::load(path)
            .with_context(|| format!("Failed to load checklist from {}", path.display())),
        None => {
            let preset: Preset = preset.unwrap_or(PresetArg::Workflow).into();
            info!(preset = preset.name(), "Using built-in checklist");
            Ok(preset.config())
        }
    }
}

fn apply_overrides(mut config: ComplianceConfig, overrides: &Overrides) -> ComplianceConfig {
    if let Some(repo) = &overrides.repo {
        config = config.with_repository(repo);
    }
    if let Some(base) = &overrides.api_base {
        config.api.base_url = base.clone();
    }
    if let Some(secs) = overrides.timeout_secs {
        config.api.timeout_secs = secs;
    }
    config
}

/// Populate the process environment from a dotenv file.
///
/// An explicit path must exist; the default `./.env` is optional.
fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

async fn cmd_check(
    config_path: Option<&Path>,
    preset: Option<PresetArg>,
    overrides: &Overrides,
    env_file: Option<&Path>,
    format: ReportFormat,
) -> Result<bool> {
    load_env_file(env_file)?;
    check_repository(
        |key| std::env::var(key).ok(),
        config_path,
        preset,
        overrides,
        format,
    )
    .await
}

/// Resolve credentials through `lookup`, then run the pipeline.
///
/// Credentials are resolved before the checklist is loaded or any client is
/// built, so a missing variable fails without touching the network.
async fn check_repository<L>(
    lookup: L,
    config_path: Option<&Path>,
    preset: Option<PresetArg>,
    overrides: &Overrides,
    format: ReportFormat,
) -> Result<bool>
where
    L: Fn(&str) -> Option<String>,
{
    let credentials = Credentials::from_lookup(lookup).context("Configuration error")?;

    let config = apply_overrides(load_config(config_path, preset)?, overrides);
    let client = GithubClient::new(&credentials, &config.repository.name, &config.api)
        .context("Failed to build API client")?;
    let pipeline = CompliancePipeline::new(config, &credentials.org, Arc::new(client))
        .context("Configuration error")?;

    info!(repository = %pipeline.repository(), "Checking repository");
    let result = pipeline.run().await;

    println!("{}", format.render(&result)?);
    Ok(result.passed())
}

fn cmd_config(preset: PresetArg) -> Result<bool> {
    let preset: Preset = preset.into();
    let toml = preset
        .config()
        .to_toml_string()
        .context("Failed to render checklist")?;
    println!("# repogate checklist: {}", preset.name());
    println!("{}", toml);
    Ok(true)
}

fn cmd_table(file: &Path, header: &str) -> Result<bool> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let rows = parse_table(&content, header);

    if rows.is_empty() {
        println!("✗ No table rows found under '{}'", header);
        return Ok(false);
    }

    for (i, row) in rows.iter().enumerate() {
        println!("{:>3}. {}", i + 1, row);
    }
    println!("✓ {} row(s)", rows.len());
    Ok(true)
}
