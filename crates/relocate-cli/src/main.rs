//! CLI for generating and self-healing mobile UI locators.
//!
//! This tool attaches to an existing Appium session (or reads a saved page
//! source) and either lists locator candidates for the current screen or
//! checks a locator file against it.
//!
//! # Usage
//!
//! ```bash
//! # Locator candidates for every element on the current screen
//! relocate --session-id 2b8f0a4e-... generate
//!
//! # Same, as JSON
//! relocate -s 2b8f0a4e-... --format json generate
//!
//! # Check a locator file, giving up after 60 seconds
//! relocate -s 2b8f0a4e-... validate locators.json --timeout 60
//!
//! # Use fuzzy text matching for alternates
//! relocate -s 2b8f0a4e-... validate locators.json --matcher fuzzy
//!
//! # Check against a page source saved earlier, no device needed
//! relocate --source screen.xml --platform android validate locators.json
//!
//! # Show (and optionally persist) the effective configuration
//! relocate --appium-url http://10.0.0.5:4723 config --save
//! ```
//!
//! # Exit codes
//!
//! | code | meaning |
//! |---|---|
//! | 0 | success |
//! | 1 | operation failed |
//! | 2 | no session or Appium unreachable |
//! | 3 | locator file missing or malformed |
//! | 4 | some locators no longer resolve |
//! | 5 | timed out |

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use relocate_core::config::RelocateConfig;
use relocate_core::driver::DriverConfig;
use relocate_core::element::Platform;
use relocate_core::error::CoreError;
use relocate_core::generate::generate_locators;
use relocate_core::locator_file::load_locator_file;
use relocate_core::matcher::MatcherKind;
use relocate_core::session::Session;
use relocate_core::validation::validate_locators;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// CLI for generating and self-healing mobile UI locators.
#[derive(Parser)]
#[command(name = "relocate")]
#[command(about = "Generate locators for the current screen and heal broken ones")]
#[command(version)]
struct Cli {
    /// Base URL of the Appium server
    #[arg(long, env = "RELOCATE_APPIUM_URL", global = true)]
    appium_url: Option<String>,

    /// Id of the existing Appium session to attach to
    #[arg(short, long, env = "RELOCATE_SESSION_ID", global = true)]
    session_id: Option<String>,

    /// Override the session's automationName capability
    #[arg(long, global = true)]
    automation_name: Option<String>,

    /// Read a saved page source instead of attaching to Appium
    #[arg(long, value_name = "FILE", requires = "platform", global = true)]
    source: Option<PathBuf>,

    /// Platform of the saved page source
    #[arg(long, value_enum, global = true)]
    platform: Option<PlatformArg>,

    /// Output format: text or json
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum PlatformArg {
    Android,
    Ios,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Android => Platform::Android,
            PlatformArg::Ios => Platform::Ios,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum MatcherArg {
    Contains,
    Fuzzy,
}

impl From<MatcherArg> for MatcherKind {
    fn from(arg: MatcherArg) -> Self {
        match arg {
            MatcherArg::Contains => MatcherKind::Contains,
            MatcherArg::Fuzzy => MatcherKind::Fuzzy,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List locator candidates for every element on the current screen
    Generate,

    /// Check a locator file against the current screen
    Validate {
        /// JSON array of recorded locators
        file: PathBuf,
        /// Give up after this many seconds
        #[arg(short, long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Text matcher used to find alternates
        #[arg(short, long, value_enum)]
        matcher: Option<MatcherArg>,
        /// Maximum alternates suggested per missing locator (at most 5)
        #[arg(long)]
        max_alternates: Option<usize>,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Persist the effective configuration to ~/.relocate/config.json
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("Error: {}", e);
        return e.exit_code();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn init_tracing(log_file: Option<&Path>) -> Result<(), CliError> {
    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("relocate.log");
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(name)
                .build(dir)
                .map_err(|e| CliError::Failed(format!("Cannot open log file {}: {}", path.display(), e)))?;
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
                )
                .with_writer(appender)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[derive(Debug)]
enum CliError {
    Connection(String),
    Failed(String),
    LocatorFile(String),
    MissingLocators(usize),
    Timeout(u64),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Failed(_) => ExitCode::from(1),
            CliError::Connection(_) => ExitCode::from(2),
            CliError::LocatorFile(_) => ExitCode::from(3),
            CliError::MissingLocators(_) => ExitCode::from(4),
            CliError::Timeout(_) => ExitCode::from(5),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::Failed(msg) => write!(f, "{}", msg),
            CliError::LocatorFile(msg) => write!(f, "{}", msg),
            CliError::MissingLocators(1) => write!(f, "1 locator no longer resolves"),
            CliError::MissingLocators(n) => write!(f, "{} locators no longer resolve", n),
            CliError::Timeout(secs) => write!(f, "Timed out after {}s", secs),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoActiveSession => CliError::Connection(err.to_string()),
            CoreError::LocatorFile(_) => CliError::LocatorFile(err.to_string()),
            other => CliError::Failed(other.to_string()),
        }
    }
}

/// File config with command-line and environment overrides applied.
fn effective_config(cli: &Cli) -> RelocateConfig {
    let mut config = RelocateConfig::load();
    if let Some(url) = &cli.appium_url {
        config.appium_url = url.clone();
    }
    if let Some(id) = &cli.session_id {
        config.session_id = Some(id.clone());
    }
    if let Some(name) = &cli.automation_name {
        config.automation_name = Some(name.clone());
    }
    if let Command::Validate { matcher, max_alternates, .. } = &cli.command {
        if let Some(matcher) = matcher {
            config.matcher = (*matcher).into();
        }
        if let Some(max) = max_alternates {
            config.max_alternates = *max;
        }
    }
    config
}

fn driver_config(cli: &Cli, config: &RelocateConfig) -> Result<DriverConfig, CliError> {
    if let (Some(path), Some(platform)) = (&cli.source, cli.platform) {
        return Ok(DriverConfig::PageSource {
            path: path.clone(),
            platform: platform.into(),
        });
    }
    let session_id = config.session_id.clone().ok_or_else(|| {
        CliError::Connection(
            "No Appium session id: pass --session-id, set RELOCATE_SESSION_ID, or use --source".to_string(),
        )
    })?;
    Ok(DriverConfig::Appium {
        url: config.appium_url.clone(),
        session_id,
        automation_name: config.automation_name.clone(),
    })
}

async fn connect(cli: &Cli, config: &RelocateConfig) -> Result<Session, CliError> {
    let driver_config = driver_config(cli, config)?;
    debug!(?driver_config, "building session driver");
    let driver = driver_config.build().await?;
    Ok(Session::with_driver(driver))
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = effective_config(&cli);

    match &cli.command {
        Command::Config { save } => {
            let json = serde_json::to_string_pretty(&config)
                .map_err(|e| CliError::Failed(format!("Failed to serialize config: {}", e)))?;
            println!("{}", json);
            if *save {
                config
                    .save()
                    .map_err(|e| CliError::Failed(format!("Failed to save config: {}", e)))?;
                if !cli.quiet {
                    eprintln!("Saved to {}", relocate_core::config::config_path().display());
                }
            }
            Ok(())
        }

        Command::Generate => {
            let session = connect(&cli, &config).await?;
            let result = generate_locators(&session).await?;
            match cli.format {
                OutputFormat::Json => output::print_json(&result)?,
                OutputFormat::Text => output::print_generation(&result, cli.quiet),
            }
            Ok(())
        }

        Command::Validate { file, timeout, .. } => {
            // The locator file is checked before anything touches the session.
            let entries = load_locator_file(file)
                .await
                .map_err(|e| CliError::LocatorFile(e.to_string()))?;
            let session = connect(&cli, &config).await?;
            let resolver = config.resolver();
            info!(
                file = %file.display(),
                entries = entries.len(),
                matcher = resolver.matcher_name(),
                "validating locators"
            );

            let validation = validate_locators(&session, &entries, &resolver);
            let report = match timeout {
                Some(secs) => tokio::time::timeout(Duration::from_secs(*secs), validation)
                    .await
                    .map_err(|_| CliError::Timeout(*secs))??,
                None => validation.await?,
            };

            match cli.format {
                OutputFormat::Json => output::print_json(&report)?,
                OutputFormat::Text => output::print_report(&report, cli.quiet),
            }

            if report.all_found() {
                Ok(())
            } else {
                Err(CliError::MissingLocators(report.missing_count))
            }
        }
    }
}
