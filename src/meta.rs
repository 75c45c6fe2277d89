//! Small key/value state persisted in `service_metadata`: sweep and
//! changes-sync timestamps survive restarts.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use crate::tmdb::Family;

pub const LAST_FULL_SWEEP: &str = "last_full_sweep";
pub const LAST_CHANGES_SYNC: &str = "last_successful_changes_sync";

pub fn family_key(base: &str, family: Family) -> String {
    format!("{base}_{}", family.label())
}

pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT value FROM service_metadata WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value)
}

pub async fn set(pool: &PgPool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO service_metadata (key, value, updated_at) VALUES ($1, $2, now()) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_timestamp(pool: &PgPool, key: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = get(pool, key).await? else {
        return Ok(None);
    };
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Ok(Some(ts.with_timezone(&Utc))),
        Err(err) => {
            warn!(key, raw = %raw, error = %err, "unparseable timestamp in service_metadata; ignoring");
            Ok(None)
        }
    }
}

pub async fn set_timestamp(pool: &PgPool, key: &str, ts: DateTime<Utc>) -> Result<()> {
    set(pool, key, &ts.to_rfc3339()).await
}
