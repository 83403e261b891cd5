use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use clubcourt_core::{Match, MatchStatus, Negotiation, Proposal, Side};

/// Create all tables if they don't exist.
pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY,
            player_a INTEGER NOT NULL,
            player_b INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'PENDING',
            scheduled_at TEXT,
            score TEXT,
            reported_by TEXT,
            logistics TEXT,
            revision INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS proposals (
            match_id INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            proposed_by TEXT NOT NULL,
            proposed_times TEXT NOT NULL,
            message TEXT,
            logistics TEXT,
            created_at TEXT NOT NULL,
            PRIMARY KEY (match_id, seq),
            FOREIGN KEY (match_id) REFERENCES matches(id)
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert a fresh PENDING pairing.
pub async fn create_match(
    pool: &SqlitePool,
    player_a: i64,
    player_b: i64,
) -> Result<Match, sqlx::Error> {
    let result = sqlx::query("INSERT INTO matches (player_a, player_b) VALUES (?1, ?2)")
        .bind(player_a)
        .bind(player_b)
        .execute(pool)
        .await?;

    Ok(Match::new(result.last_insert_rowid(), player_a, player_b))
}

/// Load a match together with its proposals.
pub async fn get_match(pool: &SqlitePool, id: i64) -> Result<Option<Match>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, player_a, player_b, status, scheduled_at, score, reported_by, logistics, revision
         FROM matches WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let proposals = sqlx::query(
        "SELECT match_id, seq, proposed_by, proposed_times, message, logistics, created_at
         FROM proposals WHERE match_id = ?1 ORDER BY seq",
    )
    .bind(id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(proposal_from_row)
    .collect::<Result<Vec<_>, _>>()?;

    let status: String = row.get("status");
    let reported_by: Option<String> = row.get("reported_by");

    Ok(Some(Match {
        id: row.get("id"),
        player_a: row.get("player_a"),
        player_b: row.get("player_b"),
        status: status.parse::<MatchStatus>().map_err(decode)?,
        scheduled_at: row
            .get::<Option<String>, _>("scheduled_at")
            .map(|raw| parse_time(&raw))
            .transpose()?,
        score: from_json(row.get("score"))?,
        reported_by: reported_by
            .map(|raw| raw.parse::<Side>().map_err(decode))
            .transpose()?,
        logistics: from_json(row.get("logistics"))?,
        negotiation: Negotiation::from_proposals(proposals),
        revision: row.get::<i64, _>("revision") as u64,
    }))
}

/// Current revision of a match, if it exists.
pub async fn get_revision(pool: &SqlitePool, id: i64) -> Result<Option<u64>, sqlx::Error> {
    let row = sqlx::query("SELECT revision FROM matches WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get::<i64, _>("revision") as u64))
}

/// Write a transitioned match back, but only if nobody else has written
/// since it was loaded at `prior_revision`. A proposal made by the
/// transition is inserted in the same transaction.
///
/// Returns `false` when the compare-and-swap lost.
pub async fn save_match(
    pool: &SqlitePool,
    m: &Match,
    prior_revision: u64,
    new_proposal: Option<&Proposal>,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE matches
         SET status = ?1, scheduled_at = ?2, score = ?3, reported_by = ?4, logistics = ?5, revision = ?6
         WHERE id = ?7 AND revision = ?8",
    )
    .bind(m.status.as_str())
    .bind(m.scheduled_at.map(|t| t.to_rfc3339()))
    .bind(to_json(&m.score)?)
    .bind(m.reported_by.map(|side| side.label().to_string()))
    .bind(to_json(&m.logistics)?)
    .bind(m.revision as i64)
    .bind(m.id)
    .bind(prior_revision as i64)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    if let Some(p) = new_proposal {
        sqlx::query(
            "INSERT INTO proposals (match_id, seq, proposed_by, proposed_times, message, logistics, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(p.match_id)
        .bind(p.seq as i64)
        .bind(p.proposed_by.label())
        .bind(to_json(&p.proposed_times)?)
        .bind(&p.message)
        .bind(to_json(&p.logistics)?)
        .bind(p.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}

fn proposal_from_row(row: &SqliteRow) -> Result<Proposal, sqlx::Error> {
    let proposed_by: String = row.get("proposed_by");
    let proposed_times: Option<Vec<DateTime<Utc>>> = from_json(row.get("proposed_times"))?;
    Ok(Proposal {
        seq: row.get::<i64, _>("seq") as u32,
        match_id: row.get("match_id"),
        proposed_by: proposed_by.parse::<Side>().map_err(decode)?,
        proposed_times: proposed_times.unwrap_or_default(),
        message: row.get("message"),
        logistics: from_json(row.get("logistics"))?,
        created_at: parse_time(&row.get::<String, _>("created_at"))?,
    })
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(decode)
}

/// `None` and JSON `null` are both stored as SQL NULL.
fn to_json<T: Serialize>(value: &T) -> Result<Option<String>, sqlx::Error> {
    let json = serde_json::to_value(value).map_err(decode)?;
    if json.is_null() {
        return Ok(None);
    }
    Ok(Some(json.to_string()))
}

fn from_json<T: DeserializeOwned>(raw: Option<String>) -> Result<Option<T>, sqlx::Error> {
    raw.map(|text| serde_json::from_str(&text).map_err(decode))
        .transpose()
}

fn decode<E: std::error::Error + Send + Sync + 'static>(err: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
