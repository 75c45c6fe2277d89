//! Bulk loader: buffers normalized rows per destination table and flushes a
//! whole batch inside one transaction, dimensions first, then roots, then
//! children and associations. Dimension keys are deduplicated build-wide so
//! a genre shared by thousands of records is inserted once.
//!
//! All INSERT statements are hand-written through `QueryBuilder`; every one
//! carries ON CONFLICT DO NOTHING so duplicates collapse silently.

use std::collections::HashSet;

use anyhow::Result;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::debug;

use crate::db::Db;
use crate::ingest::normalize::{
    AltTitleRow, CastRow, CollectionRow, CompanyRow, CountryRow, CreatedByRow, EpisodeRow,
    ExternalIdsRow, IdNameRow, LanguageRow, MovieRow, NetworkRow, NormalizedMovie,
    NormalizedSeries, ReleaseDateRow, SeasonRow, SeriesRow, VideoRow,
};

/// Rows per statement; keeps bind counts well under the wire limit even for
/// the widest tables.
const INSERT_CHUNK: usize = 1000;

pub(crate) async fn insert_id_name(
    conn: &mut PgConnection,
    table: &str,
    rows: &[IdNameRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} (id, name) "));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id).push_bind(&r.name);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_collections(
    conn: &mut PgConnection,
    table: &str,
    rows: &[CollectionRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, name, poster_path, backdrop_path) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.name)
                .push_bind(&r.poster_path)
                .push_bind(&r.backdrop_path);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_companies(
    conn: &mut PgConnection,
    table: &str,
    rows: &[CompanyRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, name, origin_country, logo_path) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.name)
                .push_bind(&r.origin_country)
                .push_bind(&r.logo_path);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_countries(
    conn: &mut PgConnection,
    table: &str,
    rows: &[CountryRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} (iso_3166_1, name) "));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(&r.iso_3166_1).push_bind(&r.name);
        });
        qb.push(" ON CONFLICT (iso_3166_1) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_languages(
    conn: &mut PgConnection,
    table: &str,
    rows: &[LanguageRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (iso_639_1, english_name, name) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(&r.iso_639_1)
                .push_bind(&r.english_name)
                .push_bind(&r.name);
        });
        qb.push(" ON CONFLICT (iso_639_1) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_cast_members(
    conn: &mut PgConnection,
    table: &str,
    rows: &[CastRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, adult, gender, cast_id, name, original_name, \
             known_for_department, popularity, profile_path, \"character\", cast_order) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.adult)
                .push_bind(r.gender)
                .push_bind(r.cast_id)
                .push_bind(&r.name)
                .push_bind(&r.original_name)
                .push_bind(&r.known_for_department)
                .push_bind(r.popularity)
                .push_bind(&r.profile_path)
                .push_bind(&r.character)
                .push_bind(r.cast_order);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_networks(
    conn: &mut PgConnection,
    table: &str,
    rows: &[NetworkRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, logo_path, name, origin_country) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.logo_path)
                .push_bind(&r.name)
                .push_bind(&r.origin_country);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_created_by(
    conn: &mut PgConnection,
    table: &str,
    rows: &[CreatedByRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, credit_id, name, original_name, gender, profile_path) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.credit_id)
                .push_bind(&r.name)
                .push_bind(&r.original_name)
                .push_bind(r.gender)
                .push_bind(&r.profile_path);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_episodes(
    conn: &mut PgConnection,
    table: &str,
    rows: &[EpisodeRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, name, overview, vote_average, vote_count, air_date, \
             episode_number, episode_type, production_code, runtime, season_number, show_id, \
             still_path) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.name)
                .push_bind(&r.overview)
                .push_bind(r.vote_average)
                .push_bind(r.vote_count)
                .push_bind(r.air_date)
                .push_bind(r.episode_number)
                .push_bind(&r.episode_type)
                .push_bind(&r.production_code)
                .push_bind(r.runtime)
                .push_bind(r.season_number)
                .push_bind(r.show_id)
                .push_bind(&r.still_path);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_movie_roots(
    conn: &mut PgConnection,
    table: &str,
    rows: &[MovieRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, backdrop_path, budget, homepage, imdb_id, origin_country, \
             original_language, original_title, overview, popularity, poster_path, release_date, \
             revenue, runtime, status, tagline, title, video, vote_average, vote_count, \
             belongs_to_collection_id) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.backdrop_path)
                .push_bind(r.budget)
                .push_bind(&r.homepage)
                .push_bind(&r.imdb_id)
                .push_bind(&r.origin_country)
                .push_bind(&r.original_language)
                .push_bind(&r.original_title)
                .push_bind(&r.overview)
                .push_bind(r.popularity)
                .push_bind(&r.poster_path)
                .push_bind(r.release_date)
                .push_bind(r.revenue)
                .push_bind(r.runtime)
                .push_bind(&r.status)
                .push_bind(&r.tagline)
                .push_bind(&r.title)
                .push_bind(r.video)
                .push_bind(r.vote_average)
                .push_bind(r.vote_count)
                .push_bind(r.belongs_to_collection_id);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_series_roots(
    conn: &mut PgConnection,
    table: &str,
    rows: &[SeriesRow],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, backdrop_path, first_air_date, homepage, imdb_id, \
             in_production, last_air_date, name, number_of_episodes, number_of_seasons, \
             origin_country, original_language, original_name, overview, popularity, \
             poster_path, status, tagline, type, vote_average, vote_count, \
             last_episode_to_air_id, next_episode_to_air_id) "
        ));
        qb.push_values(chunk, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(&r.backdrop_path)
                .push_bind(r.first_air_date)
                .push_bind(&r.homepage)
                .push_bind(&r.imdb_id)
                .push_bind(r.in_production)
                .push_bind(r.last_air_date)
                .push_bind(&r.name)
                .push_bind(r.number_of_episodes)
                .push_bind(r.number_of_seasons)
                .push_bind(&r.origin_country)
                .push_bind(&r.original_language)
                .push_bind(&r.original_name)
                .push_bind(&r.overview)
                .push_bind(r.popularity)
                .push_bind(&r.poster_path)
                .push_bind(&r.status)
                .push_bind(&r.tagline)
                .push_bind(&r.series_type)
                .push_bind(r.vote_average)
                .push_bind(r.vote_count)
                .push_bind(r.last_episode_to_air_id)
                .push_bind(r.next_episode_to_air_id);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

/// Association tables whose dimension key is a bigint.
pub(crate) async fn insert_assoc_ids(
    conn: &mut PgConnection,
    table: &str,
    root_col: &str,
    dim_col: &str,
    rows: &[(i64, i64)],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} ({root_col}, {dim_col}) "));
        qb.push_values(chunk, |mut b, (root, dim)| {
            b.push_bind(root).push_bind(dim);
        });
        qb.push(format!(" ON CONFLICT ({root_col}, {dim_col}) DO NOTHING"));
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

/// Association tables whose dimension key is an ISO code.
pub(crate) async fn insert_assoc_codes(
    conn: &mut PgConnection,
    table: &str,
    root_col: &str,
    dim_col: &str,
    rows: &[(i64, String)],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} ({root_col}, {dim_col}) "));
        qb.push_values(chunk, |mut b, (root, dim)| {
            b.push_bind(root).push_bind(dim);
        });
        qb.push(format!(" ON CONFLICT ({root_col}, {dim_col}) DO NOTHING"));
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_external_ids(
    conn: &mut PgConnection,
    table: &str,
    root_col: &str,
    rows: &[(i64, ExternalIdsRow)],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} ({root_col}, imdb_id, wikidata_id, facebook_id, instagram_id, \
             twitter_id) "
        ));
        qb.push_values(chunk, |mut b, (root, r)| {
            b.push_bind(root)
                .push_bind(&r.imdb_id)
                .push_bind(&r.wikidata_id)
                .push_bind(&r.facebook_id)
                .push_bind(&r.instagram_id)
                .push_bind(&r.twitter_id);
        });
        qb.push(format!(" ON CONFLICT ({root_col}) DO NOTHING"));
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_alt_titles(
    conn: &mut PgConnection,
    table: &str,
    root_col: &str,
    rows: &[(i64, AltTitleRow)],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (iso_3166_1, title, type, {root_col}) "
        ));
        qb.push_values(chunk, |mut b, (root, r)| {
            b.push_bind(&r.iso_3166_1)
                .push_bind(&r.title)
                .push_bind(&r.title_type)
                .push_bind(root);
        });
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_release_dates(
    conn: &mut PgConnection,
    table: &str,
    rows: &[(i64, ReleaseDateRow)],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (iso_3166_1, certification, release_date, type, note, movie_id) "
        ));
        qb.push_values(chunk, |mut b, (root, r)| {
            b.push_bind(&r.iso_3166_1)
                .push_bind(&r.certification)
                .push_bind(r.release_date)
                .push_bind(r.release_type)
                .push_bind(&r.note)
                .push_bind(root);
        });
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_videos(
    conn: &mut PgConnection,
    table: &str,
    root_col: &str,
    rows: &[(i64, VideoRow)],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, iso_639_1, iso_3166_1, name, key, site, size, type, \
             official, published_at, {root_col}) "
        ));
        qb.push_values(chunk, |mut b, (root, r)| {
            b.push_bind(&r.id)
                .push_bind(&r.iso_639_1)
                .push_bind(&r.iso_3166_1)
                .push_bind(&r.name)
                .push_bind(&r.key)
                .push_bind(&r.site)
                .push_bind(r.size)
                .push_bind(&r.video_type)
                .push_bind(r.official)
                .push_bind(r.published_at)
                .push_bind(root);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

pub(crate) async fn insert_seasons(
    conn: &mut PgConnection,
    table: &str,
    rows: &[(i64, SeasonRow)],
) -> Result<u64> {
    let mut affected = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} (id, air_date, episode_count, name, overview, poster_path, \
             season_number, vote_average, series_id) "
        ));
        qb.push_values(chunk, |mut b, (root, r)| {
            b.push_bind(r.id)
                .push_bind(r.air_date)
                .push_bind(r.episode_count)
                .push_bind(&r.name)
                .push_bind(&r.overview)
                .push_bind(&r.poster_path)
                .push_bind(r.season_number)
                .push_bind(r.vote_average)
                .push_bind(root);
        });
        qb.push(" ON CONFLICT (id) DO NOTHING");
        affected += qb.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(affected)
}

#[derive(Default)]
struct MovieBuffers {
    collections: Vec<CollectionRow>,
    genres: Vec<IdNameRow>,
    companies: Vec<CompanyRow>,
    countries: Vec<CountryRow>,
    languages: Vec<LanguageRow>,
    cast: Vec<CastRow>,
    keywords: Vec<IdNameRow>,
    movies: Vec<MovieRow>,
    genre_assoc: Vec<(i64, i64)>,
    company_assoc: Vec<(i64, i64)>,
    country_assoc: Vec<(i64, String)>,
    language_assoc: Vec<(i64, String)>,
    cast_assoc: Vec<(i64, i64)>,
    keyword_assoc: Vec<(i64, i64)>,
    external_ids: Vec<(i64, ExternalIdsRow)>,
    alt_titles: Vec<(i64, AltTitleRow)>,
    release_dates: Vec<(i64, ReleaseDateRow)>,
    videos: Vec<(i64, VideoRow)>,
}

#[derive(Default)]
struct MovieSeen {
    collections: HashSet<i64>,
    genres: HashSet<i64>,
    companies: HashSet<i64>,
    countries: HashSet<String>,
    languages: HashSet<String>,
    cast: HashSet<i64>,
    keywords: HashSet<i64>,
}

pub struct MovieLoader<'a> {
    db: &'a Db,
    prefix: &'static str,
    batch: usize,
    bufs: MovieBuffers,
    seen: MovieSeen,
    roots_inserted: u64,
}

impl<'a> MovieLoader<'a> {
    pub fn new(db: &'a Db, prefix: &'static str, batch: usize) -> Self {
        Self {
            db,
            prefix,
            batch: batch.max(1),
            bufs: MovieBuffers::default(),
            seen: MovieSeen::default(),
            roots_inserted: 0,
        }
    }

    pub async fn push(&mut self, n: NormalizedMovie) -> Result<()> {
        let movie_id = n.movie.id;

        if let Some(collection) = n.collection {
            if self.seen.collections.insert(collection.id) {
                self.bufs.collections.push(collection);
            }
        }
        for genre in n.genres {
            self.bufs.genre_assoc.push((movie_id, genre.id));
            if self.seen.genres.insert(genre.id) {
                self.bufs.genres.push(genre);
            }
        }
        for company in n.companies {
            self.bufs.company_assoc.push((movie_id, company.id));
            if self.seen.companies.insert(company.id) {
                self.bufs.companies.push(company);
            }
        }
        for country in n.countries {
            self.bufs
                .country_assoc
                .push((movie_id, country.iso_3166_1.clone()));
            if self.seen.countries.insert(country.iso_3166_1.clone()) {
                self.bufs.countries.push(country);
            }
        }
        for language in n.languages {
            self.bufs
                .language_assoc
                .push((movie_id, language.iso_639_1.clone()));
            if self.seen.languages.insert(language.iso_639_1.clone()) {
                self.bufs.languages.push(language);
            }
        }
        for member in n.cast {
            self.bufs.cast_assoc.push((movie_id, member.id));
            if self.seen.cast.insert(member.id) {
                self.bufs.cast.push(member);
            }
        }
        for keyword in n.keywords {
            self.bufs.keyword_assoc.push((movie_id, keyword.id));
            if self.seen.keywords.insert(keyword.id) {
                self.bufs.keywords.push(keyword);
            }
        }
        self.bufs.external_ids.push((movie_id, n.external_ids));
        for title in n.alt_titles {
            self.bufs.alt_titles.push((movie_id, title));
        }
        for rd in n.release_dates {
            self.bufs.release_dates.push((movie_id, rd));
        }
        for video in n.videos {
            self.bufs.videos.push((movie_id, video));
        }
        self.bufs.movies.push(n.movie);

        if self.bufs.movies.len() >= self.batch {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.bufs.movies.is_empty() && self.bufs.collections.is_empty() {
            return Ok(());
        }
        let bufs = std::mem::take(&mut self.bufs);
        let p = self.prefix;
        let mut tx = self.db.pool.begin().await?;

        insert_collections(&mut tx, &format!("{p}movie_collections"), &bufs.collections).await?;
        insert_id_name(&mut tx, &format!("{p}movie_genres"), &bufs.genres).await?;
        insert_companies(&mut tx, &format!("{p}movie_production_companies"), &bufs.companies)
            .await?;
        insert_countries(&mut tx, &format!("{p}movie_production_countries"), &bufs.countries)
            .await?;
        insert_languages(&mut tx, &format!("{p}movie_spoken_languages"), &bufs.languages).await?;
        insert_cast_members(&mut tx, &format!("{p}movie_cast_members"), &bufs.cast).await?;
        insert_id_name(&mut tx, &format!("{p}movie_keywords"), &bufs.keywords).await?;

        let roots =
            insert_movie_roots(&mut tx, &format!("{p}movie"), &bufs.movies).await?;

        insert_assoc_ids(
            &mut tx,
            &format!("{p}movie_genres_assoc"),
            "movie_id",
            "genre_id",
            &bufs.genre_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}movie_companies_assoc"),
            "movie_id",
            "company_id",
            &bufs.company_assoc,
        )
        .await?;
        insert_assoc_codes(
            &mut tx,
            &format!("{p}movie_countries_assoc"),
            "movie_id",
            "country_id",
            &bufs.country_assoc,
        )
        .await?;
        insert_assoc_codes(
            &mut tx,
            &format!("{p}movie_languages_assoc"),
            "movie_id",
            "language_id",
            &bufs.language_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}movie_cast_assoc"),
            "movie_id",
            "cast_id",
            &bufs.cast_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}movie_keywords_assoc"),
            "movie_id",
            "keyword_id",
            &bufs.keyword_assoc,
        )
        .await?;

        insert_external_ids(
            &mut tx,
            &format!("{p}movie_external_ids"),
            "movie_id",
            &bufs.external_ids,
        )
        .await?;
        insert_alt_titles(
            &mut tx,
            &format!("{p}movie_alternative_titles"),
            "movie_id",
            &bufs.alt_titles,
        )
        .await?;
        insert_release_dates(&mut tx, &format!("{p}movie_release_dates"), &bufs.release_dates)
            .await?;
        insert_videos(&mut tx, &format!("{p}movie_videos"), "movie_id", &bufs.videos).await?;

        tx.commit().await?;
        self.roots_inserted += roots;
        debug!(batch = bufs.movies.len(), total = self.roots_inserted, "movie batch flushed");
        Ok(())
    }

    pub async fn finish(mut self) -> Result<u64> {
        self.flush().await?;
        Ok(self.roots_inserted)
    }
}

#[derive(Default)]
struct SeriesBuffers {
    created_by: Vec<CreatedByRow>,
    genres: Vec<IdNameRow>,
    networks: Vec<NetworkRow>,
    companies: Vec<CompanyRow>,
    countries: Vec<CountryRow>,
    languages: Vec<LanguageRow>,
    cast: Vec<CastRow>,
    keywords: Vec<IdNameRow>,
    last_episodes: Vec<EpisodeRow>,
    next_episodes: Vec<EpisodeRow>,
    series: Vec<SeriesRow>,
    created_by_assoc: Vec<(i64, i64)>,
    genre_assoc: Vec<(i64, i64)>,
    network_assoc: Vec<(i64, i64)>,
    company_assoc: Vec<(i64, i64)>,
    country_assoc: Vec<(i64, String)>,
    language_assoc: Vec<(i64, String)>,
    cast_assoc: Vec<(i64, i64)>,
    keyword_assoc: Vec<(i64, i64)>,
    external_ids: Vec<(i64, ExternalIdsRow)>,
    alt_titles: Vec<(i64, AltTitleRow)>,
    seasons: Vec<(i64, SeasonRow)>,
    videos: Vec<(i64, VideoRow)>,
}

#[derive(Default)]
struct SeriesSeen {
    created_by: HashSet<i64>,
    genres: HashSet<i64>,
    networks: HashSet<i64>,
    companies: HashSet<i64>,
    countries: HashSet<String>,
    languages: HashSet<String>,
    cast: HashSet<i64>,
    keywords: HashSet<i64>,
}

pub struct SeriesLoader<'a> {
    db: &'a Db,
    prefix: &'static str,
    batch: usize,
    bufs: SeriesBuffers,
    seen: SeriesSeen,
    roots_inserted: u64,
}

impl<'a> SeriesLoader<'a> {
    pub fn new(db: &'a Db, prefix: &'static str, batch: usize) -> Self {
        Self {
            db,
            prefix,
            batch: batch.max(1),
            bufs: SeriesBuffers::default(),
            seen: SeriesSeen::default(),
            roots_inserted: 0,
        }
    }

    pub async fn push(&mut self, n: NormalizedSeries) -> Result<()> {
        let series_id = n.series.id;

        for creator in n.created_by {
            self.bufs.created_by_assoc.push((series_id, creator.id));
            if self.seen.created_by.insert(creator.id) {
                self.bufs.created_by.push(creator);
            }
        }
        for genre in n.genres {
            self.bufs.genre_assoc.push((series_id, genre.id));
            if self.seen.genres.insert(genre.id) {
                self.bufs.genres.push(genre);
            }
        }
        for network in n.networks {
            self.bufs.network_assoc.push((series_id, network.id));
            if self.seen.networks.insert(network.id) {
                self.bufs.networks.push(network);
            }
        }
        for company in n.companies {
            self.bufs.company_assoc.push((series_id, company.id));
            if self.seen.companies.insert(company.id) {
                self.bufs.companies.push(company);
            }
        }
        for country in n.countries {
            self.bufs
                .country_assoc
                .push((series_id, country.iso_3166_1.clone()));
            if self.seen.countries.insert(country.iso_3166_1.clone()) {
                self.bufs.countries.push(country);
            }
        }
        for language in n.languages {
            self.bufs
                .language_assoc
                .push((series_id, language.iso_639_1.clone()));
            if self.seen.languages.insert(language.iso_639_1.clone()) {
                self.bufs.languages.push(language);
            }
        }
        for member in n.cast {
            self.bufs.cast_assoc.push((series_id, member.id));
            if self.seen.cast.insert(member.id) {
                self.bufs.cast.push(member);
            }
        }
        for keyword in n.keywords {
            self.bufs.keyword_assoc.push((series_id, keyword.id));
            if self.seen.keywords.insert(keyword.id) {
                self.bufs.keywords.push(keyword);
            }
        }
        if let Some(episode) = n.last_episode {
            self.bufs.last_episodes.push(episode);
        }
        if let Some(episode) = n.next_episode {
            self.bufs.next_episodes.push(episode);
        }
        self.bufs.external_ids.push((series_id, n.external_ids));
        for title in n.alt_titles {
            self.bufs.alt_titles.push((series_id, title));
        }
        for season in n.seasons {
            self.bufs.seasons.push((series_id, season));
        }
        for video in n.videos {
            self.bufs.videos.push((series_id, video));
        }
        self.bufs.series.push(n.series);

        if self.bufs.series.len() >= self.batch {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.bufs.series.is_empty() {
            return Ok(());
        }
        let bufs = std::mem::take(&mut self.bufs);
        let p = self.prefix;
        let mut tx = self.db.pool.begin().await?;

        insert_created_by(&mut tx, &format!("{p}series_created_by"), &bufs.created_by).await?;
        insert_id_name(&mut tx, &format!("{p}series_genres"), &bufs.genres).await?;
        insert_networks(&mut tx, &format!("{p}series_networks"), &bufs.networks).await?;
        insert_companies(&mut tx, &format!("{p}series_production_companies"), &bufs.companies)
            .await?;
        insert_countries(&mut tx, &format!("{p}series_production_countries"), &bufs.countries)
            .await?;
        insert_languages(&mut tx, &format!("{p}series_spoken_languages"), &bufs.languages)
            .await?;
        insert_cast_members(&mut tx, &format!("{p}series_cast_members"), &bufs.cast).await?;
        insert_id_name(&mut tx, &format!("{p}series_keywords"), &bufs.keywords).await?;
        insert_episodes(
            &mut tx,
            &format!("{p}series_last_episode_to_air"),
            &bufs.last_episodes,
        )
        .await?;
        insert_episodes(
            &mut tx,
            &format!("{p}series_next_episode_to_air"),
            &bufs.next_episodes,
        )
        .await?;

        let roots = insert_series_roots(&mut tx, &format!("{p}series"), &bufs.series).await?;

        insert_assoc_ids(
            &mut tx,
            &format!("{p}series_created_by_assoc"),
            "series_id",
            "created_by_id",
            &bufs.created_by_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}series_genres_assoc"),
            "series_id",
            "genre_id",
            &bufs.genre_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}series_networks_assoc"),
            "series_id",
            "network_id",
            &bufs.network_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}series_companies_assoc"),
            "series_id",
            "company_id",
            &bufs.company_assoc,
        )
        .await?;
        insert_assoc_codes(
            &mut tx,
            &format!("{p}series_countries_assoc"),
            "series_id",
            "country_id",
            &bufs.country_assoc,
        )
        .await?;
        insert_assoc_codes(
            &mut tx,
            &format!("{p}series_languages_assoc"),
            "series_id",
            "language_id",
            &bufs.language_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}series_cast_assoc"),
            "series_id",
            "cast_id",
            &bufs.cast_assoc,
        )
        .await?;
        insert_assoc_ids(
            &mut tx,
            &format!("{p}series_keywords_assoc"),
            "series_id",
            "keyword_id",
            &bufs.keyword_assoc,
        )
        .await?;

        insert_external_ids(
            &mut tx,
            &format!("{p}series_external_ids"),
            "series_id",
            &bufs.external_ids,
        )
        .await?;
        insert_alt_titles(
            &mut tx,
            &format!("{p}series_alternative_titles"),
            "series_id",
            &bufs.alt_titles,
        )
        .await?;
        insert_seasons(&mut tx, &format!("{p}series_seasons"), &bufs.seasons).await?;
        insert_videos(&mut tx, &format!("{p}series_videos"), "series_id", &bufs.videos).await?;

        tx.commit().await?;
        self.roots_inserted += roots;
        debug!(batch = bufs.series.len(), total = self.roots_inserted, "series batch flushed");
        Ok(())
    }

    pub async fn finish(mut self) -> Result<u64> {
        self.flush().await?;
        Ok(self.roots_inserted)
    }
}
