//! Judgment database operations
//!
//! A judgment is written once, in the same transaction that moves its
//! argument to `complete`.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};
use thirdparty_common::Result;
use tracing::warn;
use uuid::Uuid;

use super::arguments::finish_processing;
use super::{parse_timestamp, parse_uuid};
use crate::models::{ArgumentStatus, ConversationScores, Judgment, Winner};

const JUDGMENT_COLUMNS: &str = r#"
    j.id, j.argument_id, j.winner, j.reasoning, j.full_response,
    j.respect, j.empathy, j.accountability, j.emotional_regulation,
    j.manipulation_toxicity, j.conversation_health_score,
    j.contract_version, j.created_at
"#;

/// Insert a judgment row
///
/// Fails with a unique violation if the argument already has one.
pub async fn insert_judgment<'e, E>(executor: E, judgment: &Judgment) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO judgments (
            id, argument_id, winner, reasoning, full_response,
            respect, empathy, accountability, emotional_regulation,
            manipulation_toxicity, conversation_health_score,
            contract_version, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(judgment.id.to_string())
    .bind(judgment.argument_id.to_string())
    .bind(judgment.winner.as_str())
    .bind(&judgment.reasoning)
    .bind(&judgment.full_response)
    .bind(judgment.scores.respect as i64)
    .bind(judgment.scores.empathy as i64)
    .bind(judgment.scores.accountability as i64)
    .bind(judgment.scores.emotional_regulation as i64)
    .bind(judgment.scores.manipulation_toxicity as i64)
    .bind(judgment.conversation_health_score as i64)
    .bind(&judgment.contract_version)
    .bind(judgment.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Persist a judgment and complete its argument atomically
///
/// Returns `false` and writes nothing if the argument is no longer
/// `processing` or already has a judgment.
pub async fn save_judgment_and_complete(pool: &SqlitePool, judgment: &Judgment) -> Result<bool> {
    let mut tx = pool.begin().await?;

    if !finish_processing(&mut *tx, judgment.argument_id, ArgumentStatus::Complete).await? {
        tx.rollback().await?;
        return Ok(false);
    }

    match insert_judgment(&mut *tx, judgment).await {
        Ok(()) => {}
        Err(e) if e.is_unique_violation() => {
            warn!(
                argument_id = %judgment.argument_id,
                judgment_id = %judgment.id,
                "Argument already judged, discarding duplicate judgment"
            );
            tx.rollback().await?;
            return Ok(false);
        }
        Err(e) => return Err(e),
    }
    tx.commit().await?;

    Ok(true)
}

pub async fn load_judgment_for_argument(
    pool: &SqlitePool,
    argument_id: Uuid,
) -> Result<Option<Judgment>> {
    let sql = format!(
        "SELECT {} FROM judgments j WHERE j.argument_id = ?",
        JUDGMENT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(argument_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(judgment_from_row).transpose()
}

/// All judgments on arguments owned by `user_id`
pub async fn load_judgments_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Judgment>> {
    let sql = format!(
        "SELECT {} FROM judgments j JOIN arguments a ON a.id = j.argument_id WHERE a.user_id = ?",
        JUDGMENT_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;

    rows.iter().map(judgment_from_row).collect()
}

pub async fn count_judgments_for_argument(pool: &SqlitePool, argument_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM judgments WHERE argument_id = ?")
        .bind(argument_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}

fn judgment_from_row(row: &SqliteRow) -> Result<Judgment> {
    let id: String = row.try_get("id")?;
    let argument_id: String = row.try_get("argument_id")?;
    let winner: String = row.try_get("winner")?;
    let created_at: String = row.try_get("created_at")?;

    let score = |column: &str| -> Result<u8> {
        let value: i64 = row.try_get(column)?;
        Ok(value as u8)
    };

    Ok(Judgment {
        id: parse_uuid("judgments.id", &id)?,
        argument_id: parse_uuid("judgments.argument_id", &argument_id)?,
        winner: winner.parse::<Winner>().map_err(thirdparty_common::Error::Internal)?,
        reasoning: row.try_get("reasoning")?,
        full_response: row.try_get("full_response")?,
        scores: ConversationScores {
            respect: score("respect")?,
            empathy: score("empathy")?,
            accountability: score("accountability")?,
            emotional_regulation: score("emotional_regulation")?,
            manipulation_toxicity: score("manipulation_toxicity")?,
        },
        conversation_health_score: score("conversation_health_score")?,
        contract_version: row.try_get("contract_version")?,
        created_at: parse_timestamp("judgments.created_at", &created_at)?,
    })
}
