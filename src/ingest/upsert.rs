//! Live-table upsert of a single record: delete-then-insert of the root and
//! all rows it owns, inside one transaction, so readers swap between
//! consistent versions of that record. Dimension rows are shared and only
//! ever added (ON CONFLICT DO NOTHING).

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::db::Db;
use crate::ingest::loader::{
    insert_alt_titles, insert_assoc_codes, insert_assoc_ids, insert_cast_members,
    insert_collections, insert_companies, insert_countries, insert_created_by, insert_episodes,
    insert_external_ids, insert_id_name, insert_languages, insert_movie_roots, insert_networks,
    insert_release_dates, insert_seasons, insert_series_roots, insert_videos,
};
use crate::ingest::normalize::{normalize_movie, normalize_series, NormalizedMovie, NormalizedSeries};
use crate::tmdb::{Family, TmdbError};
use crate::JobContext;

/// What a single-id refresh observed upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Applied,
    NotFound,
}

pub async fn upsert_movie(db: &Db, n: &NormalizedMovie) -> Result<()> {
    let mut tx = db.pool.begin().await?;

    if let Some(collection) = &n.collection {
        insert_collections(&mut tx, "movie_collections", std::slice::from_ref(collection))
            .await?;
    }
    insert_id_name(&mut tx, "movie_genres", &n.genres).await?;
    insert_companies(&mut tx, "movie_production_companies", &n.companies).await?;
    insert_countries(&mut tx, "movie_production_countries", &n.countries).await?;
    insert_languages(&mut tx, "movie_spoken_languages", &n.languages).await?;
    insert_cast_members(&mut tx, "movie_cast_members", &n.cast).await?;
    insert_id_name(&mut tx, "movie_keywords", &n.keywords).await?;

    // Replace the root wholesale; FKs cascade the owned rows away.
    sqlx::query("DELETE FROM movie WHERE id = $1")
        .bind(n.movie.id)
        .execute(&mut *tx)
        .await?;
    insert_movie_roots(&mut tx, "movie", std::slice::from_ref(&n.movie)).await?;

    let movie_id = n.movie.id;
    let pairs = |ids: Vec<i64>| ids.into_iter().map(|d| (movie_id, d)).collect::<Vec<_>>();
    insert_assoc_ids(
        &mut tx,
        "movie_genres_assoc",
        "movie_id",
        "genre_id",
        &pairs(n.genres.iter().map(|g| g.id).collect()),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "movie_companies_assoc",
        "movie_id",
        "company_id",
        &pairs(n.companies.iter().map(|c| c.id).collect()),
    )
    .await?;
    insert_assoc_codes(
        &mut tx,
        "movie_countries_assoc",
        "movie_id",
        "country_id",
        &n.countries
            .iter()
            .map(|c| (movie_id, c.iso_3166_1.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_assoc_codes(
        &mut tx,
        "movie_languages_assoc",
        "movie_id",
        "language_id",
        &n.languages
            .iter()
            .map(|l| (movie_id, l.iso_639_1.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "movie_cast_assoc",
        "movie_id",
        "cast_id",
        &pairs(n.cast.iter().map(|c| c.id).collect()),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "movie_keywords_assoc",
        "movie_id",
        "keyword_id",
        &pairs(n.keywords.iter().map(|k| k.id).collect()),
    )
    .await?;

    insert_external_ids(
        &mut tx,
        "movie_external_ids",
        "movie_id",
        &[(movie_id, n.external_ids.clone())],
    )
    .await?;
    insert_alt_titles(
        &mut tx,
        "movie_alternative_titles",
        "movie_id",
        &n.alt_titles
            .iter()
            .map(|t| (movie_id, t.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_release_dates(
        &mut tx,
        "movie_release_dates",
        &n.release_dates
            .iter()
            .map(|r| (movie_id, r.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_videos(
        &mut tx,
        "movie_videos",
        "movie_id",
        &n.videos
            .iter()
            .map(|v| (movie_id, v.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;

    tx.commit().await?;
    debug!(movie_id, "movie upserted");
    Ok(())
}

pub async fn upsert_series(db: &Db, n: &NormalizedSeries) -> Result<()> {
    let mut tx = db.pool.begin().await?;

    insert_created_by(&mut tx, "series_created_by", &n.created_by).await?;
    insert_id_name(&mut tx, "series_genres", &n.genres).await?;
    insert_networks(&mut tx, "series_networks", &n.networks).await?;
    insert_companies(&mut tx, "series_production_companies", &n.companies).await?;
    insert_countries(&mut tx, "series_production_countries", &n.countries).await?;
    insert_languages(&mut tx, "series_spoken_languages", &n.languages).await?;
    insert_cast_members(&mut tx, "series_cast_members", &n.cast).await?;
    insert_id_name(&mut tx, "series_keywords", &n.keywords).await?;
    if let Some(episode) = &n.last_episode {
        insert_episodes(&mut tx, "series_last_episode_to_air", std::slice::from_ref(episode))
            .await?;
    }
    if let Some(episode) = &n.next_episode {
        insert_episodes(&mut tx, "series_next_episode_to_air", std::slice::from_ref(episode))
            .await?;
    }

    sqlx::query("DELETE FROM series WHERE id = $1")
        .bind(n.series.id)
        .execute(&mut *tx)
        .await?;
    insert_series_roots(&mut tx, "series", std::slice::from_ref(&n.series)).await?;

    let series_id = n.series.id;
    let pairs = |ids: Vec<i64>| ids.into_iter().map(|d| (series_id, d)).collect::<Vec<_>>();
    insert_assoc_ids(
        &mut tx,
        "series_created_by_assoc",
        "series_id",
        "created_by_id",
        &pairs(n.created_by.iter().map(|c| c.id).collect()),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "series_genres_assoc",
        "series_id",
        "genre_id",
        &pairs(n.genres.iter().map(|g| g.id).collect()),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "series_networks_assoc",
        "series_id",
        "network_id",
        &pairs(n.networks.iter().map(|x| x.id).collect()),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "series_companies_assoc",
        "series_id",
        "company_id",
        &pairs(n.companies.iter().map(|c| c.id).collect()),
    )
    .await?;
    insert_assoc_codes(
        &mut tx,
        "series_countries_assoc",
        "series_id",
        "country_id",
        &n.countries
            .iter()
            .map(|c| (series_id, c.iso_3166_1.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_assoc_codes(
        &mut tx,
        "series_languages_assoc",
        "series_id",
        "language_id",
        &n.languages
            .iter()
            .map(|l| (series_id, l.iso_639_1.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "series_cast_assoc",
        "series_id",
        "cast_id",
        &pairs(n.cast.iter().map(|c| c.id).collect()),
    )
    .await?;
    insert_assoc_ids(
        &mut tx,
        "series_keywords_assoc",
        "series_id",
        "keyword_id",
        &pairs(n.keywords.iter().map(|k| k.id).collect()),
    )
    .await?;

    insert_external_ids(
        &mut tx,
        "series_external_ids",
        "series_id",
        &[(series_id, n.external_ids.clone())],
    )
    .await?;
    insert_alt_titles(
        &mut tx,
        "series_alternative_titles",
        "series_id",
        &n.alt_titles
            .iter()
            .map(|t| (series_id, t.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_seasons(
        &mut tx,
        "series_seasons",
        &n.seasons
            .iter()
            .map(|s| (series_id, s.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;
    insert_videos(
        &mut tx,
        "series_videos",
        "series_id",
        &n.videos
            .iter()
            .map(|v| (series_id, v.clone()))
            .collect::<Vec<_>>(),
    )
    .await?;

    tx.commit().await?;
    debug!(series_id, "series upserted");
    Ok(())
}

/// Fetch one movie and apply it to the live tables. 404 is reported, not
/// raised.
pub async fn refresh_movie(
    ctx: &JobContext,
    id: i64,
    cancel: &CancellationToken,
) -> Result<Refresh> {
    match ctx.tmdb.fetch_movie(id, cancel).await {
        Ok(rec) => {
            let normalized = normalize_movie(rec);
            upsert_movie(&ctx.db, &normalized).await?;
            Ok(Refresh::Applied)
        }
        Err(TmdbError::NotFound) => Ok(Refresh::NotFound),
        Err(err) => Err(err.into()),
    }
}

pub async fn refresh_series(
    ctx: &JobContext,
    id: i64,
    cancel: &CancellationToken,
) -> Result<Refresh> {
    match ctx.tmdb.fetch_series(id, cancel).await {
        Ok(rec) => {
            let normalized = normalize_series(rec);
            upsert_series(&ctx.db, &normalized).await?;
            Ok(Refresh::Applied)
        }
        Err(TmdbError::NotFound) => Ok(Refresh::NotFound),
        Err(err) => Err(err.into()),
    }
}

/// Remove roots from the live tables; FKs cascade associations and children.
pub async fn delete_records(db: &Db, family: Family, ids: &[i64]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut deleted = 0;
    for chunk in ids.chunks(10_000) {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = ANY($1)",
            family.root_table()
        ))
        .bind(chunk)
        .execute(&db.pool)
        .await?;
        deleted += result.rows_affected();
    }
    Ok(deleted)
}
