//! Database and wiring utilities

use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use thirdparty_arbiter::config::ArbiterConfig;
use thirdparty_common::events::ArbiterEvent;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Create temporary test database with the full schema
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> anyhow::Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let pool = thirdparty_common::db::init_database(&temp_dir.path().join("test_thirdparty.db")).await?;
    Ok((temp_dir, pool))
}

/// Configuration with all transient files under `scratch` and both
/// providers pointed at `provider_url`
pub fn test_config(scratch: &Path, provider_url: &str) -> ArbiterConfig {
    let mut config = ArbiterConfig::default();
    config.media.scratch_dir = Some(scratch.to_path_buf());
    config.transcription.endpoint = format!("{}/v1/audio/transcriptions", provider_url);
    config.transcription.request_timeout_seconds = 5;
    config.completion.endpoint = format!("{}/v1/chat/completions", provider_url);
    config.completion.request_timeout_seconds = 5;
    config
}

/// Wait for the terminal event of `argument_id`, ignoring everything else
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<ArbiterEvent>,
    argument_id: Uuid,
) -> ArbiterEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(event) if event.argument_id() == argument_id && event.is_terminal() => {
                    return event
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for terminal event")
}

/// Count files directly inside `dir`
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// Orchestrator over `pool` with the given completion service
pub fn create_test_orchestrator(
    pool: SqlitePool,
    config: &ArbiterConfig,
    completion: std::sync::Arc<dyn thirdparty_arbiter::services::CompletionService>,
) -> thirdparty_arbiter::workflow::Orchestrator {
    use thirdparty_arbiter::services::{JudgmentEngine, MediaNormalizer, Transcriber};

    thirdparty_arbiter::workflow::Orchestrator::new(
        pool,
        thirdparty_common::events::EventBus::new(100),
        JudgmentEngine::new(completion, config.completion.clone()),
        MediaNormalizer::new(config.media.clone()),
        Transcriber::new(config.transcription.clone(), "sk-test".to_string()).unwrap(),
    )
}
