//! Argument database operations
//!
//! Status transitions are conditional on the row still being `processing`,
//! which keeps `complete` and `failed` sticky even when two runs race on the
//! same argument.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use thirdparty_common::{Error, Result};
use uuid::Uuid;

use super::{judgments, parse_timestamp, parse_uuid};
use crate::models::{Argument, ArgumentStatus, ArgumentWithJudgment, Persona, TranscriptSegment};
use crate::services::Transcription;

const ARGUMENT_COLUMNS: &str = r#"
    id, user_id, person_a_name, person_b_name, persona, transcript,
    transcript_language, transcript_duration_seconds, transcript_segments,
    status, created_at
"#;

/// Insert a new argument row
pub async fn create_argument(pool: &SqlitePool, argument: &Argument) -> Result<()> {
    let segments = serde_json::to_string(&argument.transcript_segments)?;

    sqlx::query(
        r#"
        INSERT INTO arguments (
            id, user_id, person_a_name, person_b_name, persona, transcript,
            transcript_language, transcript_duration_seconds, transcript_segments,
            status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(argument.id.to_string())
    .bind(argument.user_id)
    .bind(&argument.person_a_name)
    .bind(&argument.person_b_name)
    .bind(argument.persona.as_str())
    .bind(&argument.transcript)
    .bind(&argument.transcript_language)
    .bind(argument.transcript_duration_seconds)
    .bind(segments)
    .bind(argument.status.as_str())
    .bind(argument.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load argument by id, regardless of owner (workflow access)
pub async fn load_argument(pool: &SqlitePool, id: Uuid) -> Result<Option<Argument>> {
    let sql = format!("SELECT {} FROM arguments WHERE id = ?", ARGUMENT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(argument_from_row).transpose()
}

/// Load argument and its judgment for the owning user
pub async fn load_argument_for_user(
    pool: &SqlitePool,
    id: Uuid,
    user_id: i64,
) -> Result<Option<ArgumentWithJudgment>> {
    let sql = format!(
        "SELECT {} FROM arguments WHERE id = ? AND user_id = ?",
        ARGUMENT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let argument = argument_from_row(&row)?;
            let judgment = judgments::load_judgment_for_argument(pool, argument.id).await?;
            Ok(Some(ArgumentWithJudgment { argument, judgment }))
        }
        None => Ok(None),
    }
}

/// All arguments of a user, newest first, with judgments attached
pub async fn list_arguments_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<ArgumentWithJudgment>> {
    let sql = format!(
        "SELECT {} FROM arguments WHERE user_id = ? ORDER BY created_at DESC",
        ARGUMENT_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;

    let mut by_argument: HashMap<Uuid, _> = judgments::load_judgments_for_user(pool, user_id)
        .await?
        .into_iter()
        .map(|j| (j.argument_id, j))
        .collect();

    rows.iter()
        .map(|row| {
            let argument = argument_from_row(row)?;
            let judgment = by_argument.remove(&argument.id);
            Ok(ArgumentWithJudgment { argument, judgment })
        })
        .collect()
}

/// Store the transcription of a media submission
///
/// Returns `false` (nothing written) if the argument is gone or no longer
/// `processing`.
pub async fn store_transcript(
    pool: &SqlitePool,
    id: Uuid,
    transcription: &Transcription,
) -> Result<bool> {
    let segments = serde_json::to_string(&transcription.segments)?;

    let result = sqlx::query(
        r#"
        UPDATE arguments
        SET transcript = ?,
            transcript_language = ?,
            transcript_duration_seconds = ?,
            transcript_segments = ?
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(&transcription.text)
    .bind(&transcription.language)
    .bind(transcription.duration_seconds)
    .bind(segments)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move a `processing` argument to a terminal status
///
/// Returns `false` if the argument was not `processing` (already terminal or
/// missing). Accepts a pool or an open transaction.
pub async fn finish_processing<'e, E>(executor: E, id: Uuid, status: ArgumentStatus) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    if !status.is_terminal() {
        return Err(Error::InvalidInput(format!(
            "{} is not a terminal status",
            status
        )));
    }

    let result = sqlx::query("UPDATE arguments SET status = ? WHERE id = ? AND status = 'processing'")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Fail arguments orphaned by a previous process
///
/// A `processing` row at startup has no background task left to finish it.
pub async fn fail_stale_arguments(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query("UPDATE arguments SET status = 'failed' WHERE status = 'processing'")
        .execute(pool)
        .await?;

    Ok(result.rows_affected() as usize)
}

/// Delete an argument owned by `user_id`; its judgment goes with it
///
/// Returns `false` if no such argument exists for that user.
pub async fn delete_argument(pool: &SqlitePool, id: Uuid, user_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM arguments WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

fn argument_from_row(row: &SqliteRow) -> Result<Argument> {
    let id: String = row.try_get("id")?;
    let persona: String = row.try_get("persona")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let segments: Option<String> = row.try_get("transcript_segments")?;

    let transcript_segments: Vec<TranscriptSegment> = match segments {
        Some(json) if !json.is_empty() => serde_json::from_str(&json)?,
        _ => Vec::new(),
    };

    Ok(Argument {
        id: parse_uuid("arguments.id", &id)?,
        user_id: row.try_get("user_id")?,
        person_a_name: row.try_get("person_a_name")?,
        person_b_name: row.try_get("person_b_name")?,
        persona: Persona::resolve(&persona),
        transcript: row.try_get("transcript")?,
        transcript_language: row.try_get("transcript_language")?,
        transcript_duration_seconds: row.try_get("transcript_duration_seconds")?,
        transcript_segments,
        status: status.parse::<ArgumentStatus>().map_err(Error::Internal)?,
        created_at: parse_timestamp("arguments.created_at", &created_at)?,
    })
}
