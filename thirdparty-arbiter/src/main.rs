//! thirdparty-arbiter - dispute arbitration command line
//!
//! Submits recordings or transcripts for arbitration and inspects stored
//! verdicts. Logs go to stderr; command results are printed to stdout as
//! JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use thirdparty_common::config::{default_config_path, load_toml_config, prepare_root_folder, RootFolderResolver};
use thirdparty_common::events::ArbiterEvent;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use thirdparty_arbiter::config::{resolve_openai_api_key, ArbiterConfig};
use thirdparty_arbiter::db;
use thirdparty_arbiter::services::MediaUpload;
use thirdparty_arbiter::workflow::{Submission, SubmissionContent};
use thirdparty_arbiter::Arbiter;

/// Command-line arguments for thirdparty-arbiter
#[derive(Parser, Debug)]
#[command(name = "thirdparty-arbiter")]
#[command(about = "Arbitrate recorded disputes with a language model")]
#[command(version)]
struct Args {
    /// Bootstrap TOML configuration file
    #[arg(short, long, env = "THIRDPARTY_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a recording or transcript and wait for the verdict
    Submit {
        #[arg(long, default_value_t = 1)]
        user: i64,

        /// First speaker
        #[arg(long)]
        person_a: String,

        /// Second speaker
        #[arg(long)]
        person_b: String,

        /// mediator, judge or comedic
        #[arg(long, default_value = "mediator")]
        persona: String,

        /// Audio or video recording
        #[arg(long, conflicts_with = "transcript", required_unless_present = "transcript")]
        audio: Option<PathBuf>,

        /// Plain-text transcript
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Show one argument with its judgment
    Show {
        #[arg(long, default_value_t = 1)]
        user: i64,
        id: Uuid,
    },

    /// List a user's arguments, newest first
    List {
        #[arg(long, default_value_t = 1)]
        user: i64,
    },

    /// Delete an argument and its judgment
    Delete {
        #[arg(long, default_value_t = 1)]
        user: i64,
        id: Uuid,
    },

    /// Store the provider API key in the database
    SetApiKey { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config: ArbiterConfig = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.base.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &config.base).resolve();
    let db_path = prepare_root_folder(&root_folder).context("Failed to initialize root folder")?;
    info!("Database: {}", db_path.display());

    let pool = thirdparty_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Submit {
            user,
            person_a,
            person_b,
            persona,
            audio,
            transcript,
        } => {
            let content = match (audio, transcript) {
                (Some(path), _) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    SubmissionContent::Media(MediaUpload::new(file_name, bytes))
                }
                (None, Some(path)) => SubmissionContent::Transcript(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                (None, None) => bail!("Either --audio or --transcript is required"),
            };

            let api_key = resolve_openai_api_key(&pool, &config.base).await?;
            let arbiter = Arbiter::start(pool, config, api_key).await?;

            let submission = Submission {
                user_id: user,
                persona_key: persona,
                person_a_name: person_a,
                person_b_name: person_b,
                content,
            };
            run_submission(&arbiter, submission).await?;
            arbiter.shutdown().await;
        }

        Command::Show { user, id } => {
            match db::arguments::load_argument_for_user(&pool, id, user).await? {
                Some(argument) => print_json(&argument)?,
                None => bail!("Argument {} not found", id),
            }
        }

        Command::List { user } => {
            let arguments = db::arguments::list_arguments_for_user(&pool, user).await?;
            print_json(&arguments)?;
        }

        Command::Delete { user, id } => {
            if !db::arguments::delete_argument(&pool, id, user).await? {
                bail!("Argument {} not found", id);
            }
            info!(argument_id = %id, "Argument deleted");
        }

        Command::SetApiKey { key } => {
            db::settings::set_openai_api_key(&pool, key).await?;
            info!("API key stored in database");
        }
    }

    Ok(())
}

/// Submit and block until the argument reaches a terminal state
async fn run_submission(arbiter: &Arbiter, submission: Submission) -> Result<()> {
    let user_id = submission.user_id;

    // Subscribe first so the terminal event cannot be missed
    let mut events = arbiter.subscribe();
    let argument = arbiter.submit(submission).await?;
    info!(argument_id = %argument.id, "Submitted, waiting for verdict");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.argument_id() == argument.id && event.is_terminal() => {
                    if let ArbiterEvent::ArbitrationFailed { stage, error, .. } = &event {
                        warn!(stage = %stage, error = %error, "Arbitration failed");
                    }
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged, checking stored status");
                    let stored = arbiter.show(argument.id, user_id).await?;
                    if stored.map_or(true, |s| s.argument.status.is_terminal()) {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, finishing in-flight work");
                break;
            }
        }
    }

    match arbiter.show(argument.id, user_id).await? {
        Some(stored) => print_json(&stored),
        None => bail!("Argument {} disappeared", argument.id),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
