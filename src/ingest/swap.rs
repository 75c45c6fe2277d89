//! Staging → live promotion. One transaction per family: drop the previous
//! `*_old` generation, rename live to `*_old`, rename staging to live.
//! Renames don't touch row contents, so readers see either the whole old
//! catalog or the whole new one.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{error, info};

use crate::db::Db;
use crate::schema;
use crate::tmdb::Family;

/// Refuse promotion when staging shrank by more than this share of live.
const SHRINK_THRESHOLD: f64 = 0.5;

pub fn swap_statements(family: Family) -> Vec<String> {
    let tables = schema::table_names(family);
    let mut stmts = Vec::with_capacity(tables.len() * 3);
    for t in &tables {
        stmts.push(format!("DROP TABLE IF EXISTS {t}_old CASCADE"));
    }
    for t in &tables {
        stmts.push(format!("ALTER TABLE IF EXISTS {t} RENAME TO {t}_old"));
    }
    for t in &tables {
        stmts.push(format!("ALTER TABLE staging_{t} RENAME TO {t}"));
    }
    stmts
}

pub async fn promote(db: &Db, family: Family) -> Result<()> {
    let mut tx = db.pool.begin().await?;
    for stmt in swap_statements(family) {
        sqlx::query(&stmt)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("swap statement failed: {stmt}"))?;
    }
    tx.commit().await?;
    info!(family = family.label(), "staging promoted to live");
    Ok(())
}

async fn table_count(pool: &PgPool, table: &str) -> Option<i64> {
    let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
        .bind(table)
        .fetch_one(pool)
        .await
        .ok()?;
    if !exists {
        return None;
    }
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .ok()
}

/// Guard against a bad upstream day wiping the mirror: only fail when the
/// staging root table lost more than half of live.
pub async fn safe_to_promote(db: &Db, family: Family) -> Result<bool> {
    let root = family.root_table();
    let live = table_count(&db.pool, root).await;
    let staging = table_count(&db.pool, &format!("staging_{root}")).await;

    match (live, staging) {
        (Some(live), Some(staging)) if live > 0 => {
            if staging < live {
                let change = (live - staging) as f64 / live as f64;
                if change > SHRINK_THRESHOLD {
                    error!(
                        table = root,
                        live,
                        staging,
                        shrink_pct = %format!("{:.1}", change * 100.0),
                        "row count would shrink past threshold"
                    );
                    return Ok(false);
                }
            }
            info!(table = root, live, staging, "row count check passed");
            Ok(true)
        }
        (live, staging) => {
            info!(table = root, ?live, ?staging, "skipping row count check");
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_drops_old_generation_before_renaming() {
        let stmts = swap_statements(Family::Movie);
        let first_drop = stmts.iter().position(|s| s.starts_with("DROP TABLE")).unwrap();
        let first_rename_live = stmts
            .iter()
            .position(|s| s.contains("RENAME TO") && s.contains("_old") && !s.starts_with("DROP"))
            .unwrap();
        let first_rename_staging = stmts
            .iter()
            .position(|s| s.starts_with("ALTER TABLE staging_"))
            .unwrap();
        assert!(first_drop < first_rename_live);
        assert!(first_rename_live < first_rename_staging);
    }

    #[test]
    fn every_family_table_is_swapped() {
        for family in [Family::Movie, Family::Series] {
            let stmts = swap_statements(family);
            let names = schema::table_names(family);
            assert_eq!(stmts.len(), names.len() * 3);
            for t in names {
                assert!(stmts.iter().any(|s| s == &format!("ALTER TABLE staging_{t} RENAME TO {t}")));
            }
        }
    }

    #[test]
    fn old_generation_drop_uses_cascade() {
        for stmt in swap_statements(Family::Series) {
            if stmt.starts_with("DROP TABLE") {
                assert!(stmt.ends_with("CASCADE"), "{stmt}");
            }
        }
    }
}
