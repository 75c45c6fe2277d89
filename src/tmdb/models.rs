//! Wire shapes of the upstream aggregate records. Everything except the root
//! id is optional: the upstream omits or nulls fields freely, and a partial
//! record must still normalize.

use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct IdNameJson {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CompanyJson {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
    #[serde(default)]
    pub logo_path: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CountryJson {
    #[serde(default)]
    pub iso_3166_1: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LanguageJson {
    #[serde(default)]
    pub iso_639_1: Option<String>,
    #[serde(default)]
    pub english_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CastJson {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub adult: Option<bool>,
    #[serde(default)]
    pub gender: Option<i16>,
    #[serde(default)]
    pub cast_id: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub known_for_department: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default, rename = "order")]
    pub cast_order: Option<i16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreditsJson {
    #[serde(default)]
    pub cast: Vec<CastJson>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ExternalIdsJson {
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub wikidata_id: Option<String>,
    #[serde(default)]
    pub facebook_id: Option<String>,
    #[serde(default)]
    pub instagram_id: Option<String>,
    #[serde(default)]
    pub twitter_id: Option<String>,
}

/// Keyword envelopes differ per family: movies nest under "keywords",
/// series under "results".
#[derive(Debug, Default, Clone, Deserialize)]
pub struct KeywordsJson {
    #[serde(default)]
    pub keywords: Vec<IdNameJson>,
    #[serde(default)]
    pub results: Vec<IdNameJson>,
}

impl KeywordsJson {
    pub fn entries(self) -> Vec<IdNameJson> {
        if self.keywords.is_empty() {
            self.results
        } else {
            self.keywords
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AltTitleJson {
    #[serde(default)]
    pub iso_3166_1: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub title_type: Option<String>,
}

/// Movies nest alternative titles under "titles", series under "results".
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AltTitlesJson {
    #[serde(default)]
    pub titles: Vec<AltTitleJson>,
    #[serde(default)]
    pub results: Vec<AltTitleJson>,
}

impl AltTitlesJson {
    pub fn entries(self) -> Vec<AltTitleJson> {
        if self.titles.is_empty() {
            self.results
        } else {
            self.titles
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct VideoJson {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub iso_639_1: Option<String>,
    #[serde(default)]
    pub iso_3166_1: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub size: Option<i32>,
    #[serde(default, rename = "type")]
    pub video_type: Option<String>,
    #[serde(default)]
    pub official: Option<bool>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct VideosJson {
    #[serde(default)]
    pub results: Vec<VideoJson>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReleaseJson {
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, rename = "type")]
    pub release_type: Option<i32>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReleaseGroupJson {
    #[serde(default)]
    pub iso_3166_1: Option<String>,
    #[serde(default)]
    pub release_dates: Vec<ReleaseJson>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ReleaseDatesJson {
    #[serde(default)]
    pub results: Vec<ReleaseGroupJson>,
}

#[derive(Debug, Deserialize)]
pub struct MovieRecord {
    pub id: i64,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub budget: Option<i64>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub video: Option<bool>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    /// null, a full object, or a bare id.
    #[serde(default)]
    pub belongs_to_collection: Option<serde_json::Value>,
    #[serde(default)]
    pub genres: Vec<IdNameJson>,
    #[serde(default)]
    pub production_companies: Vec<CompanyJson>,
    #[serde(default)]
    pub production_countries: Vec<CountryJson>,
    #[serde(default)]
    pub spoken_languages: Vec<LanguageJson>,
    #[serde(default)]
    pub credits: CreditsJson,
    #[serde(default)]
    pub external_ids: ExternalIdsJson,
    #[serde(default)]
    pub keywords: KeywordsJson,
    #[serde(default)]
    pub alternative_titles: AltTitlesJson,
    #[serde(default)]
    pub videos: VideosJson,
    #[serde(default)]
    pub release_dates: ReleaseDatesJson,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct NetworkJson {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreatedByJson {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub credit_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub gender: Option<i16>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct SeasonJson {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub episode_count: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub season_number: Option<i32>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct EpisodeJson {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub episode_number: Option<i32>,
    #[serde(default)]
    pub episode_type: Option<String>,
    #[serde(default)]
    pub production_code: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    #[serde(default)]
    pub season_number: Option<i32>,
    #[serde(default)]
    pub show_id: Option<i64>,
    #[serde(default)]
    pub still_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesRecord {
    pub id: i64,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub in_production: Option<bool>,
    #[serde(default)]
    pub last_air_date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub number_of_episodes: Option<i32>,
    #[serde(default)]
    pub number_of_seasons: Option<i32>,
    #[serde(default)]
    pub origin_country: Vec<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default, rename = "type")]
    pub series_type: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub created_by: Vec<CreatedByJson>,
    #[serde(default)]
    pub genres: Vec<IdNameJson>,
    #[serde(default)]
    pub networks: Vec<NetworkJson>,
    #[serde(default)]
    pub production_companies: Vec<CompanyJson>,
    #[serde(default)]
    pub production_countries: Vec<CountryJson>,
    #[serde(default)]
    pub spoken_languages: Vec<LanguageJson>,
    #[serde(default)]
    pub seasons: Vec<SeasonJson>,
    #[serde(default)]
    pub last_episode_to_air: Option<EpisodeJson>,
    #[serde(default)]
    pub next_episode_to_air: Option<EpisodeJson>,
    #[serde(default)]
    pub credits: CreditsJson,
    #[serde(default)]
    pub external_ids: ExternalIdsJson,
    #[serde(default)]
    pub keywords: KeywordsJson,
    #[serde(default)]
    pub alternative_titles: AltTitlesJson,
    #[serde(default)]
    pub videos: VideosJson,
}
