//! Flattens one upstream aggregate record into typed rows per destination
//! table. Normalization is pure: no I/O, no schema knowledge beyond column
//! shapes. Per-record duplicates collapse here (first occurrence wins);
//! build-wide dimension dedup happens in the loader.

use std::collections::HashSet;
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::tmdb::models::{
    AltTitleJson, CastJson, CompanyJson, CountryJson, EpisodeJson, ExternalIdsJson, IdNameJson,
    LanguageJson, MovieRecord, SeriesRecord, VideoJson,
};

#[derive(Debug, Clone)]
pub struct MovieRow {
    pub id: i64,
    pub backdrop_path: Option<String>,
    pub budget: Option<i64>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub origin_country: Option<String>,
    pub original_language: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub release_date: Option<NaiveDateTime>,
    pub revenue: Option<i64>,
    pub runtime: Option<i32>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub title: Option<String>,
    pub video: Option<bool>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub belongs_to_collection_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SeriesRow {
    pub id: i64,
    pub backdrop_path: Option<String>,
    pub first_air_date: Option<NaiveDateTime>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub in_production: Option<bool>,
    pub last_air_date: Option<NaiveDateTime>,
    pub name: Option<String>,
    pub number_of_episodes: Option<i32>,
    pub number_of_seasons: Option<i32>,
    pub origin_country: Option<String>,
    pub original_language: Option<String>,
    pub original_name: Option<String>,
    pub overview: Option<String>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub series_type: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub last_episode_to_air_id: Option<i64>,
    pub next_episode_to_air_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct IdNameRow {
    pub id: i64,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CollectionRow {
    pub id: i64,
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompanyRow {
    pub id: i64,
    pub name: Option<String>,
    pub origin_country: Option<String>,
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CountryRow {
    pub iso_3166_1: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LanguageRow {
    pub iso_639_1: String,
    pub english_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CastRow {
    pub id: i64,
    pub adult: Option<bool>,
    pub gender: Option<i16>,
    pub cast_id: Option<i32>,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub known_for_department: Option<String>,
    pub popularity: Option<f64>,
    pub profile_path: Option<String>,
    pub character: Option<String>,
    pub cast_order: Option<i16>,
}

#[derive(Debug, Clone)]
pub struct NetworkRow {
    pub id: i64,
    pub logo_path: Option<String>,
    pub name: Option<String>,
    pub origin_country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedByRow {
    pub id: i64,
    pub credit_id: Option<String>,
    pub name: Option<String>,
    pub original_name: Option<String>,
    pub gender: Option<i16>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SeasonRow {
    pub id: i64,
    pub air_date: Option<NaiveDateTime>,
    pub episode_count: Option<i32>,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub season_number: Option<i32>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct EpisodeRow {
    pub id: i64,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub air_date: Option<NaiveDateTime>,
    pub episode_number: Option<i32>,
    pub episode_type: Option<String>,
    pub production_code: Option<String>,
    pub runtime: Option<i32>,
    pub season_number: Option<i32>,
    pub show_id: Option<i64>,
    pub still_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalIdsRow {
    pub imdb_id: Option<String>,
    pub wikidata_id: Option<String>,
    pub facebook_id: Option<String>,
    pub instagram_id: Option<String>,
    pub twitter_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AltTitleRow {
    pub iso_3166_1: Option<String>,
    pub title: Option<String>,
    pub title_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReleaseDateRow {
    pub iso_3166_1: Option<String>,
    pub certification: Option<String>,
    pub release_date: Option<NaiveDateTime>,
    pub release_type: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VideoRow {
    pub id: String,
    pub iso_639_1: Option<String>,
    pub iso_3166_1: Option<String>,
    pub name: Option<String>,
    pub key: Option<String>,
    pub site: Option<String>,
    pub size: Option<i32>,
    pub video_type: Option<String>,
    pub official: Option<bool>,
    pub published_at: Option<NaiveDateTime>,
}

/// One movie record flattened into rows. The external-ids row always exists.
#[derive(Debug, Clone)]
pub struct NormalizedMovie {
    pub movie: MovieRow,
    pub collection: Option<CollectionRow>,
    pub genres: Vec<IdNameRow>,
    pub companies: Vec<CompanyRow>,
    pub countries: Vec<CountryRow>,
    pub languages: Vec<LanguageRow>,
    pub cast: Vec<CastRow>,
    pub keywords: Vec<IdNameRow>,
    pub external_ids: ExternalIdsRow,
    pub alt_titles: Vec<AltTitleRow>,
    pub release_dates: Vec<ReleaseDateRow>,
    pub videos: Vec<VideoRow>,
}

#[derive(Debug, Clone)]
pub struct NormalizedSeries {
    pub series: SeriesRow,
    pub created_by: Vec<CreatedByRow>,
    pub genres: Vec<IdNameRow>,
    pub networks: Vec<NetworkRow>,
    pub companies: Vec<CompanyRow>,
    pub countries: Vec<CountryRow>,
    pub languages: Vec<LanguageRow>,
    pub cast: Vec<CastRow>,
    pub keywords: Vec<IdNameRow>,
    pub last_episode: Option<EpisodeRow>,
    pub next_episode: Option<EpisodeRow>,
    pub seasons: Vec<SeasonRow>,
    pub external_ids: ExternalIdsRow,
    pub alt_titles: Vec<AltTitleRow>,
    pub videos: Vec<VideoRow>,
}

/// Parse both date ("2024-01-31") and datetime ("2024-01-31T12:00:00.000Z")
/// strings; anything else is treated as absent.
pub fn parse_datetime(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains('T') {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.naive_utc())
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

fn dedupe_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn first_origin_country(list: Vec<String>) -> Option<String> {
    list.into_iter().next()
}

fn external_ids_row(ext: ExternalIdsJson) -> ExternalIdsRow {
    ExternalIdsRow {
        imdb_id: ext.imdb_id,
        wikidata_id: ext.wikidata_id,
        facebook_id: ext.facebook_id,
        instagram_id: ext.instagram_id,
        twitter_id: ext.twitter_id,
    }
}

fn id_name_rows(items: Vec<IdNameJson>) -> Vec<IdNameRow> {
    let rows: Vec<IdNameRow> = items
        .into_iter()
        .filter_map(|g| g.id.map(|id| IdNameRow { id, name: g.name }))
        .collect();
    dedupe_by_key(rows, |r| r.id)
}

fn company_rows(items: Vec<CompanyJson>) -> Vec<CompanyRow> {
    let rows: Vec<CompanyRow> = items
        .into_iter()
        .filter_map(|c| {
            c.id.map(|id| CompanyRow {
                id,
                name: c.name,
                origin_country: c.origin_country,
                logo_path: c.logo_path,
            })
        })
        .collect();
    dedupe_by_key(rows, |r| r.id)
}

fn country_rows(items: Vec<CountryJson>) -> Vec<CountryRow> {
    let rows: Vec<CountryRow> = items
        .into_iter()
        .filter_map(|c| {
            c.iso_3166_1
                .filter(|code| !code.is_empty())
                .map(|iso_3166_1| CountryRow { iso_3166_1, name: c.name })
        })
        .collect();
    dedupe_by_key(rows, |r| r.iso_3166_1.clone())
}

fn language_rows(items: Vec<LanguageJson>) -> Vec<LanguageRow> {
    let rows: Vec<LanguageRow> = items
        .into_iter()
        .filter_map(|l| {
            l.iso_639_1.filter(|code| !code.is_empty()).map(|iso_639_1| LanguageRow {
                iso_639_1,
                english_name: l.english_name,
                name: l.name,
            })
        })
        .collect();
    dedupe_by_key(rows, |r| r.iso_639_1.clone())
}

fn cast_rows(items: Vec<CastJson>) -> Vec<CastRow> {
    let rows: Vec<CastRow> = items
        .into_iter()
        .filter_map(|c| {
            c.id.map(|id| CastRow {
                id,
                adult: c.adult,
                gender: c.gender,
                cast_id: c.cast_id,
                name: c.name,
                original_name: c.original_name,
                known_for_department: c.known_for_department,
                popularity: c.popularity,
                profile_path: c.profile_path,
                character: c.character,
                cast_order: c.cast_order,
            })
        })
        .collect();
    dedupe_by_key(rows, |r| r.id)
}

fn video_rows(items: Vec<VideoJson>) -> Vec<VideoRow> {
    let rows: Vec<VideoRow> = items
        .into_iter()
        .filter(|v| !v.id.is_empty())
        .map(|v| VideoRow {
            published_at: parse_datetime(v.published_at.as_deref()),
            id: v.id,
            iso_639_1: v.iso_639_1,
            iso_3166_1: v.iso_3166_1,
            name: v.name,
            key: v.key,
            site: v.site,
            size: v.size,
            video_type: v.video_type,
            official: v.official,
        })
        .collect();
    dedupe_by_key(rows, |r| r.id.clone())
}

fn alt_title_rows(items: Vec<AltTitleJson>) -> Vec<AltTitleRow> {
    items
        .into_iter()
        .map(|t| AltTitleRow {
            iso_3166_1: t.iso_3166_1,
            title: t.title,
            title_type: t.title_type,
        })
        .collect()
}

fn episode_row(ep: EpisodeJson) -> Option<EpisodeRow> {
    ep.id.map(|id| EpisodeRow {
        id,
        name: ep.name,
        overview: ep.overview,
        vote_average: ep.vote_average,
        vote_count: ep.vote_count,
        air_date: parse_datetime(ep.air_date.as_deref()),
        episode_number: ep.episode_number,
        episode_type: ep.episode_type,
        production_code: ep.production_code,
        runtime: ep.runtime,
        season_number: ep.season_number,
        show_id: ep.show_id,
        still_path: ep.still_path,
    })
}

/// null → no row; object → full dimension row; bare id → stub row so the
/// root's FK stays valid.
fn collection_row(value: Option<&serde_json::Value>) -> Option<CollectionRow> {
    match value? {
        serde_json::Value::Object(obj) => obj.get("id").and_then(|v| v.as_i64()).map(|id| {
            let field = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(str::to_string);
            CollectionRow {
                id,
                name: field("name"),
                poster_path: field("poster_path"),
                backdrop_path: field("backdrop_path"),
            }
        }),
        serde_json::Value::Number(n) => n.as_i64().map(|id| CollectionRow {
            id,
            name: None,
            poster_path: None,
            backdrop_path: None,
        }),
        _ => None,
    }
}

pub fn normalize_movie(rec: MovieRecord) -> NormalizedMovie {
    let collection = collection_row(rec.belongs_to_collection.as_ref());

    let release_dates: Vec<ReleaseDateRow> = rec
        .release_dates
        .results
        .into_iter()
        .flat_map(|group| {
            let iso = group.iso_3166_1;
            group.release_dates.into_iter().map(move |release| ReleaseDateRow {
                iso_3166_1: iso.clone(),
                certification: non_empty(release.certification),
                release_date: parse_datetime(release.release_date.as_deref()),
                release_type: release.release_type,
                note: release.note,
            })
        })
        .collect();

    let movie = MovieRow {
        id: rec.id,
        backdrop_path: rec.backdrop_path,
        budget: rec.budget,
        homepage: rec.homepage,
        imdb_id: rec.imdb_id,
        origin_country: first_origin_country(rec.origin_country),
        original_language: rec.original_language,
        original_title: rec.original_title,
        overview: rec.overview,
        popularity: rec.popularity,
        poster_path: rec.poster_path,
        release_date: parse_datetime(rec.release_date.as_deref()),
        revenue: rec.revenue,
        runtime: rec.runtime,
        status: rec.status,
        tagline: rec.tagline,
        title: rec.title,
        video: rec.video,
        vote_average: rec.vote_average,
        vote_count: rec.vote_count,
        belongs_to_collection_id: collection.as_ref().map(|c| c.id),
    };

    NormalizedMovie {
        movie,
        collection,
        genres: id_name_rows(rec.genres),
        companies: company_rows(rec.production_companies),
        countries: country_rows(rec.production_countries),
        languages: language_rows(rec.spoken_languages),
        cast: cast_rows(rec.credits.cast),
        keywords: id_name_rows(rec.keywords.entries()),
        external_ids: external_ids_row(rec.external_ids),
        alt_titles: alt_title_rows(rec.alternative_titles.entries()),
        release_dates,
        videos: video_rows(rec.videos.results),
    }
}

pub fn normalize_series(rec: SeriesRecord) -> NormalizedSeries {
    let last_episode = rec.last_episode_to_air.and_then(episode_row);
    let next_episode = rec.next_episode_to_air.and_then(episode_row);

    let seasons: Vec<SeasonRow> = dedupe_by_key(
        rec.seasons
            .into_iter()
            .filter_map(|s| {
                s.id.map(|id| SeasonRow {
                    id,
                    air_date: parse_datetime(s.air_date.as_deref()),
                    episode_count: s.episode_count,
                    name: s.name,
                    overview: s.overview,
                    poster_path: s.poster_path,
                    season_number: s.season_number,
                    vote_average: s.vote_average,
                })
            })
            .collect(),
        |s: &SeasonRow| s.id,
    );

    let networks: Vec<NetworkRow> = dedupe_by_key(
        rec.networks
            .into_iter()
            .filter_map(|n| {
                n.id.map(|id| NetworkRow {
                    id,
                    logo_path: n.logo_path,
                    name: n.name,
                    origin_country: n.origin_country,
                })
            })
            .collect(),
        |n: &NetworkRow| n.id,
    );

    let created_by: Vec<CreatedByRow> = dedupe_by_key(
        rec.created_by
            .into_iter()
            .filter_map(|c| {
                c.id.map(|id| CreatedByRow {
                    id,
                    credit_id: c.credit_id,
                    name: c.name,
                    original_name: c.original_name,
                    gender: c.gender,
                    profile_path: c.profile_path,
                })
            })
            .collect(),
        |c: &CreatedByRow| c.id,
    );

    let series = SeriesRow {
        id: rec.id,
        backdrop_path: rec.backdrop_path,
        first_air_date: parse_datetime(rec.first_air_date.as_deref()),
        homepage: rec.homepage,
        imdb_id: rec.imdb_id,
        in_production: rec.in_production,
        last_air_date: parse_datetime(rec.last_air_date.as_deref()),
        name: rec.name,
        number_of_episodes: rec.number_of_episodes,
        number_of_seasons: rec.number_of_seasons,
        origin_country: first_origin_country(rec.origin_country),
        original_language: rec.original_language,
        original_name: rec.original_name,
        overview: rec.overview,
        popularity: rec.popularity,
        poster_path: rec.poster_path,
        status: rec.status,
        tagline: rec.tagline,
        series_type: rec.series_type,
        vote_average: rec.vote_average,
        vote_count: rec.vote_count,
        last_episode_to_air_id: last_episode.as_ref().map(|e| e.id),
        next_episode_to_air_id: next_episode.as_ref().map(|e| e.id),
    };

    NormalizedSeries {
        series,
        created_by,
        genres: id_name_rows(rec.genres),
        networks,
        companies: company_rows(rec.production_companies),
        countries: country_rows(rec.production_countries),
        languages: language_rows(rec.spoken_languages),
        cast: cast_rows(rec.credits.cast),
        keywords: id_name_rows(rec.keywords.entries()),
        last_episode,
        next_episode,
        seasons,
        external_ids: external_ids_row(rec.external_ids),
        alt_titles: alt_title_rows(rec.alternative_titles.entries()),
        videos: video_rows(rec.videos.results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie_json() -> serde_json::Value {
        serde_json::json!({
            "id": 603,
            "title": "The Matrix",
            "original_title": "The Matrix",
            "release_date": "1999-03-30",
            "budget": 63000000,
            "runtime": 136,
            "video": false,
            "vote_average": 8.2,
            "vote_count": 24000,
            "origin_country": ["US"],
            "belongs_to_collection": {
                "id": 2344,
                "name": "The Matrix Collection",
                "poster_path": "/matrix.jpg"
            },
            "genres": [
                {"id": 28, "name": "Action"},
                {"id": 878, "name": "Science Fiction"},
                {"id": 28, "name": "Action"}
            ],
            "production_companies": [
                {"id": 79, "name": "Village Roadshow", "origin_country": "US", "logo_path": null}
            ],
            "production_countries": [
                {"iso_3166_1": "US", "name": "United States of America"}
            ],
            "spoken_languages": [
                {"iso_639_1": "en", "english_name": "English", "name": "English"}
            ],
            "credits": {
                "cast": [
                    {"id": 6384, "name": "Keanu Reeves", "character": "Neo", "order": 0, "gender": 2},
                    {"id": 2975, "name": "Laurence Fishburne", "character": "Morpheus", "order": 1, "gender": 2}
                ]
            },
            "external_ids": {
                "imdb_id": "tt0133093",
                "wikidata_id": "Q83495"
            },
            "keywords": {
                "keywords": [{"id": 310, "name": "artificial intelligence"}]
            },
            "alternative_titles": {
                "titles": [{"iso_3166_1": "DE", "title": "Matrix", "type": ""}]
            },
            "videos": {
                "results": [
                    {"id": "v1", "key": "abc", "site": "YouTube", "type": "Trailer",
                     "published_at": "2010-01-01T12:00:00.000Z"}
                ]
            },
            "release_dates": {
                "results": [
                    {"iso_3166_1": "US", "release_dates": [
                        {"certification": "R", "release_date": "1999-03-30T00:00:00.000Z", "type": 3},
                        {"certification": "", "release_date": "1999-06-01", "type": 4}
                    ]}
                ]
            }
        })
    }

    #[test]
    fn flattens_a_full_movie_record() {
        let rec: MovieRecord = serde_json::from_value(movie_json()).unwrap();
        let n = normalize_movie(rec);

        assert_eq!(n.movie.id, 603);
        assert_eq!(n.movie.origin_country.as_deref(), Some("US"));
        assert_eq!(n.movie.belongs_to_collection_id, Some(2344));
        assert_eq!(n.collection.as_ref().unwrap().name.as_deref(), Some("The Matrix Collection"));
        assert_eq!(n.genres.len(), 2, "duplicate genre ids collapse");
        assert_eq!(n.companies.len(), 1);
        assert_eq!(n.countries[0].iso_3166_1, "US");
        assert_eq!(n.languages[0].iso_639_1, "en");
        assert_eq!(n.keywords.len(), 1);
        assert_eq!(n.release_dates.len(), 2);
        assert_eq!(n.videos.len(), 1);
        assert!(n.videos[0].published_at.is_some());
    }

    #[test]
    fn cast_order_is_preserved() {
        let rec: MovieRecord = serde_json::from_value(movie_json()).unwrap();
        let n = normalize_movie(rec);
        assert_eq!(n.cast.len(), 2);
        assert_eq!(n.cast[0].cast_order, Some(0));
        assert_eq!(n.cast[1].cast_order, Some(1));
        assert_eq!(n.cast[0].character.as_deref(), Some("Neo"));
    }

    #[test]
    fn empty_certification_normalizes_to_null() {
        let rec: MovieRecord = serde_json::from_value(movie_json()).unwrap();
        let n = normalize_movie(rec);
        assert_eq!(n.release_dates[0].certification.as_deref(), Some("R"));
        assert_eq!(n.release_dates[1].certification, None);
    }

    #[test]
    fn external_ids_row_exists_for_any_field_subset() {
        // every subset of the five fields must still yield exactly one row
        let fields = ["imdb_id", "wikidata_id", "facebook_id", "instagram_id", "twitter_id"];
        for mask in 0..(1u32 << fields.len()) {
            let mut ext = serde_json::Map::new();
            for (i, f) in fields.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    ext.insert((*f).to_string(), serde_json::json!("x"));
                }
            }
            let mut doc = movie_json();
            doc["external_ids"] = serde_json::Value::Object(ext);
            let rec: MovieRecord = serde_json::from_value(doc).unwrap();
            let n = normalize_movie(rec);
            let populated = [
                &n.external_ids.imdb_id,
                &n.external_ids.wikidata_id,
                &n.external_ids.facebook_id,
                &n.external_ids.instagram_id,
                &n.external_ids.twitter_id,
            ]
            .iter()
            .filter(|v| v.is_some())
            .count();
            assert_eq!(populated, mask.count_ones() as usize, "mask {mask:#b}");
        }
    }

    #[test]
    fn missing_external_ids_object_does_not_abort_the_record() {
        let mut doc = movie_json();
        doc.as_object_mut().unwrap().remove("external_ids");
        let rec: MovieRecord = serde_json::from_value(doc).unwrap();
        let n = normalize_movie(rec);
        assert!(n.external_ids.imdb_id.is_none());
    }

    #[test]
    fn bare_collection_id_yields_stub_dimension_row() {
        let mut doc = movie_json();
        doc["belongs_to_collection"] = serde_json::json!(2344);
        let rec: MovieRecord = serde_json::from_value(doc).unwrap();
        let n = normalize_movie(rec);
        assert_eq!(n.movie.belongs_to_collection_id, Some(2344));
        let stub = n.collection.unwrap();
        assert_eq!(stub.id, 2344);
        assert!(stub.name.is_none());
    }

    #[test]
    fn null_collection_is_absent() {
        let mut doc = movie_json();
        doc["belongs_to_collection"] = serde_json::Value::Null;
        let rec: MovieRecord = serde_json::from_value(doc).unwrap();
        let n = normalize_movie(rec);
        assert!(n.collection.is_none());
        assert!(n.movie.belongs_to_collection_id.is_none());
    }

    #[test]
    fn minimal_record_normalizes() {
        let rec: MovieRecord = serde_json::from_value(serde_json::json!({"id": 42})).unwrap();
        let n = normalize_movie(rec);
        assert_eq!(n.movie.id, 42);
        assert!(n.genres.is_empty());
        assert!(n.collection.is_none());
    }

    #[test]
    fn parse_datetime_handles_both_shapes() {
        assert!(parse_datetime(Some("1999-03-30")).is_some());
        assert!(parse_datetime(Some("2010-01-01T12:00:00.000Z")).is_some());
        assert!(parse_datetime(Some("")).is_none());
        assert!(parse_datetime(Some("soonish")).is_none());
        assert!(parse_datetime(None).is_none());
    }

    fn series_json() -> serde_json::Value {
        serde_json::json!({
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "in_production": false,
            "number_of_episodes": 62,
            "number_of_seasons": 5,
            "origin_country": ["US"],
            "type": "Scripted",
            "created_by": [
                {"id": 66633, "credit_id": "c1", "name": "Vince Gilligan", "gender": 2}
            ],
            "genres": [{"id": 18, "name": "Drama"}],
            "networks": [{"id": 174, "name": "AMC", "origin_country": "US"}],
            "seasons": [
                {"id": 3572, "season_number": 1, "episode_count": 7, "air_date": "2008-01-20"},
                {"id": 3573, "season_number": 2, "episode_count": 13}
            ],
            "last_episode_to_air": {"id": 62161, "episode_number": 16, "season_number": 5, "air_date": "2013-09-29"},
            "next_episode_to_air": null,
            "credits": {"cast": [{"id": 17419, "name": "Bryan Cranston", "character": "Walter White", "order": 0}]},
            "external_ids": {"imdb_id": "tt0903747"},
            "keywords": {"results": [{"id": 1, "name": "drug cartel"}]},
            "alternative_titles": {"results": [{"iso_3166_1": "RU", "title": "Во все тяжкие"}]},
            "videos": {"results": []}
        })
    }

    #[test]
    fn flattens_a_series_record() {
        let rec: SeriesRecord = serde_json::from_value(series_json()).unwrap();
        let n = normalize_series(rec);

        assert_eq!(n.series.id, 1396);
        assert_eq!(n.series.series_type.as_deref(), Some("Scripted"));
        assert_eq!(n.series.last_episode_to_air_id, Some(62161));
        assert!(n.series.next_episode_to_air_id.is_none());
        assert_eq!(n.created_by.len(), 1);
        assert_eq!(n.networks[0].id, 174);
        assert_eq!(n.seasons.len(), 2);
        assert_eq!(n.keywords.len(), 1, "series keywords come from the results envelope");
        assert_eq!(n.alt_titles.len(), 1);
        assert_eq!(n.cast[0].cast_order, Some(0));
        assert_eq!(n.external_ids.imdb_id.as_deref(), Some("tt0903747"));
    }
}
