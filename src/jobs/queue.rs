//! PostgreSQL-backed job queue and the advisory locks behind single-flight.
//!
//! Inserting into `job_queue` fires a NOTIFY; the worker LISTENs and drains.
//! Global jobs are guarded by a session advisory lock the worker holds on a
//! dedicated connection for the job's duration; enqueue paths probe the same
//! lock with a transaction-scoped variant so CLI and REST can reject
//! duplicates without racing the worker.

use anyhow::Result;
use sqlx::{Connection, PgConnection, PgPool};

use super::JobKind;

/// Advisory-lock class for job locks; the second key is `hashtext(name)`.
pub const JOB_LOCK_CLASS: i32 = 0x746d_6462; // "tmdb"

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    AlreadyRunning,
}

/// Enqueue a job. Global jobs are rejected while their named lock is held.
pub async fn enqueue_job(pool: &PgPool, kind: &JobKind) -> Result<Enqueue> {
    if kind.is_global() {
        let mut tx = pool.begin().await?;
        let free: bool =
            sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1, hashtext($2))")
                .bind(JOB_LOCK_CLASS)
                .bind(kind.name())
                .fetch_one(&mut *tx)
                .await?;
        if !free {
            return Ok(Enqueue::AlreadyRunning);
        }
        insert_row(&mut tx, kind).await?;
        tx.commit().await?;
    } else {
        let mut conn = pool.acquire().await?;
        insert_row(&mut conn, kind).await?;
    }
    Ok(Enqueue::Queued)
}

async fn insert_row(conn: &mut PgConnection, kind: &JobKind) -> Result<()> {
    sqlx::query("INSERT INTO job_queue (job_type, payload) VALUES ($1, $2)")
        .bind(kind.name())
        .bind(kind.payload())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// A named cross-process lock held for the lifetime of this value. The lock
/// lives on its own connection; dropping the value closes the session and
/// releases the lock even on panic or cancellation.
pub struct JobLock {
    _conn: PgConnection,
}

impl JobLock {
    pub async fn try_acquire(database_uri: &str, key: &str) -> Result<Option<Self>> {
        let mut conn = PgConnection::connect(database_uri).await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1, hashtext($2))")
            .bind(JOB_LOCK_CLASS)
            .bind(key)
            .fetch_one(&mut conn)
            .await?;
        if acquired {
            Ok(Some(Self { _conn: conn }))
        } else {
            let _ = conn.close().await;
            Ok(None)
        }
    }
}
