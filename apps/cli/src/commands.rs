//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use intake_core::IntakeEngine;
use intake_shared::{
    AppConfig, CallStage, CallerId, TranscriptInput, init_config, load_config, load_config_from,
};
use intake_storage::{ProfileStore, Storage};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Intake: extract business-formation facts from call transcripts.
#[derive(Parser)]
#[command(
    name = "intake",
    version,
    about = "Extract business-formation facts from call transcripts and prepare the next call.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.intake/intake.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Profile database, overriding `storage.db_path`.
    #[arg(long, global = true, env = "INTAKE_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Process one call transcript and update the caller's profile.
    Process {
        /// Caller identity (phone number or user id).
        #[arg(long)]
        caller: String,

        /// Call stage, 1 through 4.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
        stage: u8,

        /// Transcript file. Reads stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Skip language-model augmentation.
        #[arg(long)]
        no_llm: bool,
    },

    /// Print the script for the caller's next call.
    Prompt {
        #[arg(long)]
        caller: String,

        /// Print the full prompt record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the caller's accumulated profile and per-stage scores.
    Profile {
        #[arg(long)]
        caller: String,
    },

    /// List the caller's processed calls.
    History {
        #[arg(long)]
        caller: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "intake=info",
        1 => "intake=debug",
        _ => "intake=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs on stderr; stdout carries command output.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        config_path: cli.config,
        db: cli.db,
    };

    match cli.command {
        Command::Process {
            caller,
            stage,
            file,
            no_llm,
        } => cmd_process(&ctx, &caller, stage, file.as_deref(), no_llm).await,
        Command::Prompt { caller, json } => cmd_prompt(&ctx, &caller, json).await,
        Command::Profile { caller } => cmd_profile(&ctx, &caller).await,
        Command::History { caller } => cmd_history(&ctx, &caller).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&ctx),
        },
    }
}

/// Global options shared by every command.
struct Context {
    config_path: Option<PathBuf>,
    db: Option<PathBuf>,
}

impl Context {
    fn config(&self) -> Result<AppConfig> {
        let config = match &self.config_path {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        Ok(config)
    }

    fn db_path(&self, config: &AppConfig) -> Result<PathBuf> {
        match &self.db {
            Some(path) => Ok(path.clone()),
            None => Ok(config.storage.resolved_db_path()?),
        }
    }

    /// Open the database for reading, or `None` when it was never created.
    async fn open_readonly(&self, config: &AppConfig) -> Result<Option<Storage>> {
        let path = self.db_path(config)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Storage::open_readonly(&path).await?))
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_process(
    ctx: &Context,
    caller: &str,
    stage: u8,
    file: Option<&Path>,
    no_llm: bool,
) -> Result<()> {
    let config = ctx.config()?;
    let caller = CallerId::new(caller)?;
    let stage = CallStage::new(stage)?;
    let raw_text = read_transcript(file)?;

    let db_path = ctx.db_path(&config)?;
    let store: Arc<dyn ProfileStore> = Arc::new(Storage::open(&db_path).await?);
    let engine = if no_llm {
        IntakeEngine::new(&config, store, None)?
    } else {
        IntakeEngine::from_config(&config, store)?
    };

    info!(
        caller = %caller,
        stage = stage.number(),
        chars = raw_text.len(),
        augmentation = engine.augmentation_enabled(),
        "processing transcript"
    );

    let outcome = engine
        .process_transcript(&TranscriptInput::new(raw_text, stage, caller))
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn cmd_prompt(ctx: &Context, caller: &str, json: bool) -> Result<()> {
    let config = ctx.config()?;
    let caller = CallerId::new(caller)?;

    let prompt = match ctx.open_readonly(&config).await? {
        Some(storage) => {
            let engine = IntakeEngine::new(&config, Arc::new(storage), None)?;
            engine.generate_prompt(&caller).await?
        }
        None => {
            // No database yet: every caller is new.
            let generator = intake_core::StagePromptGenerator::from_config(&config)?;
            generator.generate(&caller, None)?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&prompt)?);
    } else {
        println!("{}", prompt.rendered_text);
    }
    Ok(())
}

async fn cmd_profile(ctx: &Context, caller: &str) -> Result<()> {
    let config = ctx.config()?;
    let caller = CallerId::new(caller)?;

    let Some(storage) = ctx.open_readonly(&config).await? else {
        return Err(eyre!("no profile database yet; process a transcript first"));
    };
    let storage = Arc::new(storage);
    let Some(stored) = storage.get_profile(&caller).await? else {
        return Err(eyre!("no profile stored for caller '{caller}'"));
    };

    let engine = IntakeEngine::new(&config, storage, None)?;
    let mut scores = serde_json::Map::new();
    for stage in CallStage::all() {
        let result = engine.score(&caller, stage).await?;
        scores.insert(stage.number().to_string(), serde_json::to_value(&result)?);
    }

    let report = serde_json::json!({
        "caller": caller,
        "version": stored.version,
        "profile": stored.profile,
        "scores": scores,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_history(ctx: &Context, caller: &str) -> Result<()> {
    let config = ctx.config()?;
    let caller = CallerId::new(caller)?;

    let calls = match ctx.open_readonly(&config).await? {
        Some(storage) => storage.list_calls(&caller).await?,
        None => Vec::new(),
    };

    if calls.is_empty() {
        println!("No calls recorded for {caller}.");
        return Ok(());
    }

    println!();
    println!("  {:<27} {:<6} {:>5} {:>5}  {}", "WHEN", "STAGE", "SCORE", "CONF", "AUGMENTATION");
    for call in &calls {
        println!(
            "  {:<27} {:<6} {:>5} {:>5}  {}",
            call.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            call.stage.number(),
            call.completeness,
            call.confidence,
            call.augmentation,
        );
    }
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Read the transcript from `file`, or stdin when no file is given.
fn read_transcript(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read transcript {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .wrap_err("failed to read transcript from stdin")?;
            Ok(text)
        }
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
    fn process_rejects_out_of_range_stage() {
        let parsed = Cli::try_parse_from(["intake", "process", "--caller", "x", "--stage", "5"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "intake", "prompt", "--caller", "+16195550100", "--db", "/tmp/x.db", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.db.as_deref(), Some(Path::new("/tmp/x.db")));
        assert!(matches!(cli.command, Command::Prompt { json: false, .. }));
    }
}
