//! Authenticated upstream client. Retries transient failures with jittered
//! exponential backoff; 404 is surfaced as data, not as an error.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use reqwest::{header, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::tmdb::changes::ChangesPage;
use crate::tmdb::gate::RequestGate;
use crate::tmdb::models::{MovieRecord, SeriesRecord};
use crate::tmdb::Family;

pub const API_BASE: &str = "https://api.themoviedb.org";
pub const EXPORT_BASE: &str = "http://files.tmdb.org/p/exports";

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_BASE_MS: u64 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized (status {0})")]
    Unauthorized(u16),
    #[error("upstream status {0}")]
    Status(u16),
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cancelled")]
    Cancelled,
}

impl TmdbError {
    /// Errors that must abort the whole job rather than skip one record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TmdbError::Unauthorized(_))
    }
}

#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    token: Arc<str>,
    gate: Arc<RequestGate>,
    api_base: Arc<str>,
    export_base: Arc<str>,
}

impl TmdbClient {
    pub fn new(cfg: &Config, gate: Arc<RequestGate>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            token: Arc::from(cfg.tmdb_read_access_token.as_str()),
            gate,
            api_base: Arc::from(API_BASE),
            export_base: Arc::from(EXPORT_BASE),
        })
    }

    /// Aggregate movie pull: details plus every appended sub-resource the
    /// mirror stores.
    pub async fn fetch_movie(
        &self,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<MovieRecord, TmdbError> {
        let url = format!(
            "{}/3/movie/{id}?append_to_response=alternative_titles,credits,external_ids,keywords,release_dates,videos",
            self.api_base
        );
        self.get_json(&url, cancel).await
    }

    pub async fn fetch_series(
        &self,
        id: i64,
        cancel: &CancellationToken,
    ) -> Result<SeriesRecord, TmdbError> {
        let url = format!(
            "{}/3/tv/{id}?append_to_response=alternative_titles,credits,external_ids,keywords,videos",
            self.api_base
        );
        self.get_json(&url, cancel).await
    }

    pub async fn fetch_changes_page(
        &self,
        family: Family,
        start_date: NaiveDate,
        end_date: NaiveDate,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<ChangesPage, TmdbError> {
        let url = format!(
            "{}/3/{}/changes?start_date={}&end_date={}&page={page}",
            self.api_base,
            family.endpoint(),
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d"),
        );
        self.get_json(&url, cancel).await
    }

    /// Raw gzipped id-export file for the given UTC date.
    pub async fn fetch_export_file(
        &self,
        family: Family,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TmdbError> {
        let url = format!(
            "{}/{}_ids_{:02}_{:02}_{}.json.gz",
            self.export_base,
            family.export_kind(),
            date.month(),
            date.day(),
            date.year(),
        );
        // The export host is public; no bearer token.
        let resp = self.get_with_retries(&url, false, cancel).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, TmdbError> {
        let resp = self.get_with_retries(url, true, cancel).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_with_retries(
        &self,
        url: &str,
        with_auth: bool,
        cancel: &CancellationToken,
    ) -> Result<Response, TmdbError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            // The permit covers the request, not the backoff sleep.
            let delay = {
                let _permit = self
                    .gate
                    .acquire(cancel)
                    .await
                    .map_err(|_| TmdbError::Cancelled)?;

                let mut request = self.http.get(url).header(header::ACCEPT, "application/json");
                if with_auth {
                    request = request.bearer_auth(self.token.as_ref());
                }

                match request.send().await {
                    Ok(resp) => {
                        let status = resp.status();
                        if status.is_success() {
                            return Ok(resp);
                        }
                        match status {
                            StatusCode::NOT_FOUND => return Err(TmdbError::NotFound),
                            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                                return Err(TmdbError::Unauthorized(status.as_u16()))
                            }
                            s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
                                if attempt >= MAX_ATTEMPTS {
                                    return Err(TmdbError::Status(status.as_u16()));
                                }
                                retry_after(&resp)
                                    .map(Duration::from_secs)
                                    .unwrap_or_else(|| backoff_delay(attempt))
                            }
                            s => return Err(TmdbError::Status(s.as_u16())),
                        }
                    }
                    Err(err) => {
                        if attempt >= MAX_ATTEMPTS {
                            return Err(TmdbError::Network(err));
                        }
                        backoff_delay(attempt)
                    }
                }
            };

            warn!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying upstream request");
            tokio::select! {
                _ = cancel.cancelled() => return Err(TmdbError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn retry_after(resp: &Response) -> Option<u64> {
    resp.headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after)
}

pub(crate) fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

fn backoff_delay(attempt: u32) -> Duration {
    let base = BACKOFF_BASE_MS.saturating_mul(1 << (attempt - 1).min(8));
    let jitter = rand::thread_rng().gen_range(0..=250);
    Duration::from_millis(base + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_parses_integer_seconds() {
        assert_eq!(parse_retry_after("7"), Some(7));
        assert_eq!(parse_retry_after(" 12 "), Some(12));
        assert_eq!(parse_retry_after("soon"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn backoff_grows_per_attempt_with_bounded_jitter() {
        for attempt in 1..=5u32 {
            let base = BACKOFF_BASE_MS * (1 << (attempt - 1));
            let d = backoff_delay(attempt).as_millis() as u64;
            assert!(d >= base && d <= base + 250, "attempt {attempt}: {d}ms");
        }
    }

    #[test]
    fn only_auth_failures_are_fatal() {
        assert!(TmdbError::Unauthorized(401).is_fatal());
        assert!(TmdbError::Unauthorized(403).is_fatal());
        assert!(!TmdbError::NotFound.is_fatal());
        assert!(!TmdbError::Status(500).is_fatal());
        assert!(!TmdbError::Cancelled.is_fatal());
    }
}
