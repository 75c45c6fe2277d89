//! Explicit schema declarations for both catalog families plus the service
//! tables. DDL templates carry a `{p}` prefix placeholder so the same
//! definition builds live tables (empty prefix) and `staging_*` siblings.
//! Tables are listed in creation order: dimension tables before roots,
//! roots before the children and associations that reference them.

use anyhow::{Context, Result};
use tracing::info;

use crate::db::Db;
use crate::tmdb::Family;

pub struct TableDef {
    pub name: &'static str,
    pub ddl: &'static str,
}

pub const MOVIE_TABLES: &[TableDef] = &[
    TableDef {
        name: "movie_collections",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_collections (
            id BIGINT PRIMARY KEY,
            name TEXT,
            poster_path VARCHAR(255),
            backdrop_path VARCHAR(255)
        )",
    },
    TableDef {
        name: "movie_genres",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_genres (
            id BIGINT PRIMARY KEY,
            name VARCHAR(255)
        )",
    },
    TableDef {
        name: "movie_production_companies",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_production_companies (
            id BIGINT PRIMARY KEY,
            name TEXT,
            origin_country VARCHAR(255),
            logo_path VARCHAR(255)
        )",
    },
    TableDef {
        name: "movie_production_countries",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_production_countries (
            iso_3166_1 TEXT PRIMARY KEY,
            name TEXT
        )",
    },
    TableDef {
        name: "movie_spoken_languages",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_spoken_languages (
            iso_639_1 TEXT PRIMARY KEY,
            english_name VARCHAR(255),
            name VARCHAR(255)
        )",
    },
    TableDef {
        name: "movie_cast_members",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_cast_members (
            id BIGINT PRIMARY KEY,
            adult BOOLEAN,
            gender SMALLINT,
            cast_id INTEGER,
            name VARCHAR(255),
            original_name VARCHAR(255),
            known_for_department VARCHAR(255),
            popularity DOUBLE PRECISION,
            profile_path VARCHAR(255),
            \"character\" TEXT,
            cast_order SMALLINT
        )",
    },
    TableDef {
        name: "movie_keywords",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_keywords (
            id BIGINT PRIMARY KEY,
            name VARCHAR(255)
        )",
    },
    TableDef {
        name: "movie",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie (
            id BIGINT PRIMARY KEY,
            backdrop_path VARCHAR(255),
            budget BIGINT,
            homepage TEXT,
            imdb_id VARCHAR(12),
            origin_country TEXT,
            original_language VARCHAR(64),
            original_title TEXT,
            overview TEXT,
            popularity DOUBLE PRECISION,
            poster_path VARCHAR(255),
            release_date TIMESTAMP,
            revenue BIGINT,
            runtime INTEGER,
            status TEXT,
            tagline TEXT,
            title TEXT,
            video BOOLEAN,
            vote_average DOUBLE PRECISION,
            vote_count BIGINT,
            belongs_to_collection_id BIGINT REFERENCES {p}movie_collections (id)
        )",
    },
    TableDef {
        name: "movie_genres_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_genres_assoc (
            movie_id BIGINT NOT NULL REFERENCES {p}movie (id) ON DELETE CASCADE,
            genre_id BIGINT NOT NULL REFERENCES {p}movie_genres (id),
            PRIMARY KEY (movie_id, genre_id)
        )",
    },
    TableDef {
        name: "movie_companies_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_companies_assoc (
            movie_id BIGINT NOT NULL REFERENCES {p}movie (id) ON DELETE CASCADE,
            company_id BIGINT NOT NULL REFERENCES {p}movie_production_companies (id),
            PRIMARY KEY (movie_id, company_id)
        )",
    },
    TableDef {
        name: "movie_countries_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_countries_assoc (
            movie_id BIGINT NOT NULL REFERENCES {p}movie (id) ON DELETE CASCADE,
            country_id TEXT NOT NULL REFERENCES {p}movie_production_countries (iso_3166_1),
            PRIMARY KEY (movie_id, country_id)
        )",
    },
    TableDef {
        name: "movie_languages_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_languages_assoc (
            movie_id BIGINT NOT NULL REFERENCES {p}movie (id) ON DELETE CASCADE,
            language_id TEXT NOT NULL REFERENCES {p}movie_spoken_languages (iso_639_1),
            PRIMARY KEY (movie_id, language_id)
        )",
    },
    TableDef {
        name: "movie_cast_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_cast_assoc (
            movie_id BIGINT NOT NULL REFERENCES {p}movie (id) ON DELETE CASCADE,
            cast_id BIGINT NOT NULL REFERENCES {p}movie_cast_members (id),
            PRIMARY KEY (movie_id, cast_id)
        )",
    },
    TableDef {
        name: "movie_keywords_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_keywords_assoc (
            movie_id BIGINT NOT NULL REFERENCES {p}movie (id) ON DELETE CASCADE,
            keyword_id BIGINT NOT NULL REFERENCES {p}movie_keywords (id),
            PRIMARY KEY (movie_id, keyword_id)
        )",
    },
    TableDef {
        name: "movie_external_ids",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_external_ids (
            movie_id BIGINT PRIMARY KEY REFERENCES {p}movie (id) ON DELETE CASCADE,
            imdb_id VARCHAR(255),
            wikidata_id VARCHAR(255),
            facebook_id VARCHAR(255),
            instagram_id VARCHAR(255),
            twitter_id VARCHAR(255)
        )",
    },
    TableDef {
        name: "movie_alternative_titles",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_alternative_titles (
            id BIGSERIAL PRIMARY KEY,
            iso_3166_1 TEXT,
            title TEXT,
            type TEXT,
            movie_id BIGINT REFERENCES {p}movie (id) ON DELETE CASCADE
        )",
    },
    TableDef {
        name: "movie_release_dates",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_release_dates (
            id BIGSERIAL PRIMARY KEY,
            iso_3166_1 TEXT,
            certification TEXT,
            release_date TIMESTAMP,
            type INTEGER,
            note TEXT,
            movie_id BIGINT REFERENCES {p}movie (id) ON DELETE CASCADE
        )",
    },
    TableDef {
        name: "movie_videos",
        ddl: "CREATE TABLE IF NOT EXISTS {p}movie_videos (
            id VARCHAR(255) PRIMARY KEY,
            iso_639_1 TEXT,
            iso_3166_1 TEXT,
            name TEXT,
            key VARCHAR(255),
            site VARCHAR(255),
            size INTEGER,
            type VARCHAR(255),
            official BOOLEAN,
            published_at TIMESTAMP,
            movie_id BIGINT REFERENCES {p}movie (id) ON DELETE CASCADE
        )",
    },
];

pub const SERIES_TABLES: &[TableDef] = &[
    TableDef {
        name: "series_created_by",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_created_by (
            id BIGINT PRIMARY KEY,
            credit_id VARCHAR(255),
            name TEXT,
            original_name TEXT,
            gender SMALLINT,
            profile_path VARCHAR(255)
        )",
    },
    TableDef {
        name: "series_genres",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_genres (
            id BIGINT PRIMARY KEY,
            name VARCHAR(255)
        )",
    },
    TableDef {
        name: "series_networks",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_networks (
            id BIGINT PRIMARY KEY,
            logo_path VARCHAR(255),
            name TEXT,
            origin_country VARCHAR(64)
        )",
    },
    TableDef {
        name: "series_production_companies",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_production_companies (
            id BIGINT PRIMARY KEY,
            name TEXT,
            origin_country VARCHAR(255),
            logo_path VARCHAR(255)
        )",
    },
    TableDef {
        name: "series_production_countries",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_production_countries (
            iso_3166_1 TEXT PRIMARY KEY,
            name TEXT
        )",
    },
    TableDef {
        name: "series_spoken_languages",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_spoken_languages (
            iso_639_1 TEXT PRIMARY KEY,
            english_name VARCHAR(255),
            name VARCHAR(255)
        )",
    },
    TableDef {
        name: "series_cast_members",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_cast_members (
            id BIGINT PRIMARY KEY,
            adult BOOLEAN,
            gender SMALLINT,
            cast_id INTEGER,
            name VARCHAR(255),
            original_name VARCHAR(255),
            known_for_department VARCHAR(255),
            popularity DOUBLE PRECISION,
            profile_path VARCHAR(255),
            \"character\" TEXT,
            cast_order SMALLINT
        )",
    },
    TableDef {
        name: "series_keywords",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_keywords (
            id BIGINT PRIMARY KEY,
            name VARCHAR(255)
        )",
    },
    TableDef {
        name: "series_last_episode_to_air",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_last_episode_to_air (
            id BIGINT PRIMARY KEY,
            name TEXT,
            overview TEXT,
            vote_average DOUBLE PRECISION,
            vote_count BIGINT,
            air_date TIMESTAMP,
            episode_number INTEGER,
            episode_type TEXT,
            production_code TEXT,
            runtime INTEGER,
            season_number INTEGER,
            show_id BIGINT,
            still_path VARCHAR(255)
        )",
    },
    TableDef {
        name: "series_next_episode_to_air",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_next_episode_to_air (
            id BIGINT PRIMARY KEY,
            name TEXT,
            overview TEXT,
            vote_average DOUBLE PRECISION,
            vote_count BIGINT,
            air_date TIMESTAMP,
            episode_number INTEGER,
            episode_type TEXT,
            production_code TEXT,
            runtime INTEGER,
            season_number INTEGER,
            show_id BIGINT,
            still_path VARCHAR(255)
        )",
    },
    TableDef {
        name: "series",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series (
            id BIGINT PRIMARY KEY,
            backdrop_path VARCHAR(255),
            first_air_date TIMESTAMP,
            homepage TEXT,
            imdb_id VARCHAR(12),
            in_production BOOLEAN,
            last_air_date TIMESTAMP,
            name TEXT,
            number_of_episodes INTEGER,
            number_of_seasons INTEGER,
            origin_country VARCHAR(64),
            original_language VARCHAR(64),
            original_name TEXT,
            overview TEXT,
            popularity DOUBLE PRECISION,
            poster_path VARCHAR(255),
            status TEXT,
            tagline TEXT,
            type TEXT,
            vote_average DOUBLE PRECISION,
            vote_count BIGINT,
            last_episode_to_air_id BIGINT REFERENCES {p}series_last_episode_to_air (id),
            next_episode_to_air_id BIGINT REFERENCES {p}series_next_episode_to_air (id)
        )",
    },
    TableDef {
        name: "series_created_by_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_created_by_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            created_by_id BIGINT NOT NULL REFERENCES {p}series_created_by (id),
            PRIMARY KEY (series_id, created_by_id)
        )",
    },
    TableDef {
        name: "series_genres_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_genres_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            genre_id BIGINT NOT NULL REFERENCES {p}series_genres (id),
            PRIMARY KEY (series_id, genre_id)
        )",
    },
    TableDef {
        name: "series_networks_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_networks_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            network_id BIGINT NOT NULL REFERENCES {p}series_networks (id),
            PRIMARY KEY (series_id, network_id)
        )",
    },
    TableDef {
        name: "series_companies_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_companies_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            company_id BIGINT NOT NULL REFERENCES {p}series_production_companies (id),
            PRIMARY KEY (series_id, company_id)
        )",
    },
    TableDef {
        name: "series_countries_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_countries_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            country_id TEXT NOT NULL REFERENCES {p}series_production_countries (iso_3166_1),
            PRIMARY KEY (series_id, country_id)
        )",
    },
    TableDef {
        name: "series_languages_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_languages_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            language_id TEXT NOT NULL REFERENCES {p}series_spoken_languages (iso_639_1),
            PRIMARY KEY (series_id, language_id)
        )",
    },
    TableDef {
        name: "series_cast_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_cast_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            cast_id BIGINT NOT NULL REFERENCES {p}series_cast_members (id),
            PRIMARY KEY (series_id, cast_id)
        )",
    },
    TableDef {
        name: "series_keywords_assoc",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_keywords_assoc (
            series_id BIGINT NOT NULL REFERENCES {p}series (id) ON DELETE CASCADE,
            keyword_id BIGINT NOT NULL REFERENCES {p}series_keywords (id),
            PRIMARY KEY (series_id, keyword_id)
        )",
    },
    TableDef {
        name: "series_external_ids",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_external_ids (
            series_id BIGINT PRIMARY KEY REFERENCES {p}series (id) ON DELETE CASCADE,
            imdb_id VARCHAR(255),
            wikidata_id VARCHAR(255),
            facebook_id VARCHAR(255),
            instagram_id VARCHAR(255),
            twitter_id VARCHAR(255)
        )",
    },
    TableDef {
        name: "series_alternative_titles",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_alternative_titles (
            id BIGSERIAL PRIMARY KEY,
            iso_3166_1 TEXT,
            title TEXT,
            type TEXT,
            series_id BIGINT REFERENCES {p}series (id) ON DELETE CASCADE
        )",
    },
    TableDef {
        name: "series_seasons",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_seasons (
            id BIGINT PRIMARY KEY,
            air_date TIMESTAMP,
            episode_count INTEGER,
            name TEXT,
            overview TEXT,
            poster_path VARCHAR(255),
            season_number INTEGER,
            vote_average DOUBLE PRECISION,
            series_id BIGINT REFERENCES {p}series (id) ON DELETE CASCADE
        )",
    },
    TableDef {
        name: "series_videos",
        ddl: "CREATE TABLE IF NOT EXISTS {p}series_videos (
            id VARCHAR(255) PRIMARY KEY,
            iso_639_1 TEXT,
            iso_3166_1 TEXT,
            name TEXT,
            key VARCHAR(255),
            site VARCHAR(255),
            size INTEGER,
            type VARCHAR(255),
            official BOOLEAN,
            published_at TIMESTAMP,
            series_id BIGINT REFERENCES {p}series (id) ON DELETE CASCADE
        )",
    },
];

const SERVICE_METADATA_DDL: &str = "CREATE TABLE IF NOT EXISTS service_metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const JOB_QUEUE_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS job_queue (
        id BIGSERIAL PRIMARY KEY,
        job_type TEXT NOT NULL,
        payload TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE OR REPLACE FUNCTION notify_new_job() RETURNS trigger AS $$
    BEGIN
        PERFORM pg_notify('new_job', NEW.id::text);
        RETURN NEW;
    END;
    $$ LANGUAGE plpgsql",
    "DROP TRIGGER IF EXISTS job_insert_notify ON job_queue",
    "CREATE TRIGGER job_insert_notify
        AFTER INSERT ON job_queue
        FOR EACH ROW EXECUTE FUNCTION notify_new_job()",
];

pub fn family_tables(family: Family) -> &'static [TableDef] {
    match family {
        Family::Movie => MOVIE_TABLES,
        Family::Series => SERIES_TABLES,
    }
}

pub fn table_names(family: Family) -> Vec<&'static str> {
    family_tables(family).iter().map(|t| t.name).collect()
}

pub fn create_statements(family: Family, prefix: &str) -> Vec<String> {
    family_tables(family)
        .iter()
        .map(|t| t.ddl.replace("{p}", prefix))
        .collect()
}

/// Drops in reverse creation order; CASCADE covers anything the order misses.
pub fn drop_statements(family: Family, prefix: &str) -> Vec<String> {
    family_tables(family)
        .iter()
        .rev()
        .map(|t| format!("DROP TABLE IF EXISTS {prefix}{} CASCADE", t.name))
        .collect()
}

/// Create the live tables for both families plus the metadata table.
pub async fn create_live_tables(db: &Db) -> Result<()> {
    let mut tx = db.pool.begin().await?;
    for family in [Family::Movie, Family::Series] {
        for stmt in create_statements(family, "") {
            sqlx::query(&stmt)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("creating {} tables", family.label()))?;
        }
    }
    sqlx::query(SERVICE_METADATA_DDL).execute(&mut *tx).await?;
    tx.commit().await?;
    info!("live tables ensured");
    Ok(())
}

/// Rebuild the staging set for one family: drop leftovers, create fresh.
pub async fn create_staging_tables(db: &Db, family: Family) -> Result<()> {
    let mut tx = db.pool.begin().await?;
    for stmt in drop_statements(family, "staging_") {
        sqlx::query(&stmt).execute(&mut *tx).await?;
    }
    for stmt in create_statements(family, "staging_") {
        sqlx::query(&stmt)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("creating staging {} tables", family.label()))?;
    }
    tx.commit().await?;
    info!(family = family.label(), "staging tables created");
    Ok(())
}

/// Ensure the job queue table and its NOTIFY trigger exist.
pub async fn init_job_queue(db: &Db) -> Result<()> {
    for stmt in JOB_QUEUE_DDL {
        sqlx::query(stmt).execute(&db.pool).await?;
    }
    Ok(())
}

pub async fn apply_unaccent(db: &Db) -> Result<()> {
    info!("ensuring unaccent extension");
    sqlx::query("CREATE EXTENSION IF NOT EXISTS unaccent")
        .execute(&db.pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_family_matches_published_table_set() {
        let names = table_names(Family::Movie);
        for expected in [
            "movie",
            "movie_collections",
            "movie_genres",
            "movie_genres_assoc",
            "movie_production_companies",
            "movie_companies_assoc",
            "movie_production_countries",
            "movie_countries_assoc",
            "movie_spoken_languages",
            "movie_languages_assoc",
            "movie_alternative_titles",
            "movie_cast_members",
            "movie_cast_assoc",
            "movie_external_ids",
            "movie_keywords",
            "movie_keywords_assoc",
            "movie_release_dates",
            "movie_videos",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert_eq!(names.len(), 18);
    }

    #[test]
    fn series_family_matches_published_table_set() {
        let names = table_names(Family::Series);
        for expected in [
            "series",
            "series_created_by",
            "series_created_by_assoc",
            "series_networks",
            "series_networks_assoc",
            "series_seasons",
            "series_last_episode_to_air",
            "series_next_episode_to_air",
            "series_external_ids",
            "series_keywords_assoc",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert_eq!(names.len(), 23);
    }

    #[test]
    fn prefix_lands_on_every_referenced_table() {
        for family in [Family::Movie, Family::Series] {
            for stmt in create_statements(family, "staging_") {
                assert!(!stmt.contains("{p}"), "unexpanded prefix in: {stmt}");
                assert!(stmt.contains("staging_"), "prefix missing in: {stmt}");
                // FK targets must stay inside the same generation.
                for reference in stmt.split("REFERENCES ").skip(1) {
                    assert!(
                        reference.trim_start().starts_with("staging_"),
                        "cross-generation reference in: {stmt}"
                    );
                }
            }
        }
    }

    #[test]
    fn dimension_tables_precede_roots_and_associations() {
        let names = table_names(Family::Movie);
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("movie_collections") < pos("movie"));
        assert!(pos("movie") < pos("movie_genres_assoc"));
        assert!(pos("movie_genres") < pos("movie_genres_assoc"));

        let names = table_names(Family::Series);
        let pos = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(pos("series_last_episode_to_air") < pos("series"));
        assert!(pos("series_next_episode_to_air") < pos("series"));
        assert!(pos("series") < pos("series_seasons"));
    }
}
