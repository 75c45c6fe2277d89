//! Daily id-export files: newline-delimited JSON, gzipped. The export for a
//! given UTC day is published with some lag, so today's file is tried first
//! and yesterday's used as the fallback.

use std::collections::HashSet;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use flate2::read::GzDecoder;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Family, TmdbClient, TmdbError};

#[derive(Debug, Clone, Deserialize)]
pub struct ExportEntry {
    pub id: i64,
    #[serde(default)]
    pub adult: bool,
}

pub fn parse_export(gz: &[u8]) -> Result<Vec<ExportEntry>> {
    let reader = BufReader::new(GzDecoder::new(gz));
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line.context("reading export line")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ExportEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(error = %err, "skipping invalid export line"),
        }
    }
    Ok(entries)
}

pub async fn download_export(
    client: &TmdbClient,
    family: Family,
    cancel: &CancellationToken,
) -> Result<Vec<ExportEntry>> {
    let today = Utc::now().date_naive();
    let bytes = match client.fetch_export_file(family, today, cancel).await {
        Ok(bytes) => bytes,
        Err(TmdbError::NotFound) => {
            info!(
                family = family.label(),
                "export for today not published yet; falling back to yesterday"
            );
            let yesterday = today - ChronoDuration::days(1);
            client.fetch_export_file(family, yesterday, cancel).await?
        }
        Err(err) => return Err(err.into()),
    };
    let entries = parse_export(&bytes)?;
    info!(family = family.label(), count = entries.len(), "export id file loaded");
    Ok(entries)
}

pub fn id_set(entries: &[ExportEntry], filter_adult: bool) -> HashSet<i64> {
    entries
        .iter()
        .filter(|e| !(filter_adult && e.adult))
        .map(|e| e.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gz(content: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn parses_newline_delimited_entries() {
        let data = gz("{\"id\":603,\"adult\":false}\n{\"id\":604}\n{\"id\":99,\"adult\":true}\n");
        let entries = parse_export(&data).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, 603);
        assert!(!entries[1].adult, "missing adult flag defaults to false");
        assert!(entries[2].adult);
    }

    #[test]
    fn invalid_lines_are_skipped_not_fatal() {
        let data = gz("{\"id\":1}\nnot-json\n\n{\"id\":2,\"adult\":false}\n");
        let entries = parse_export(&data).unwrap();
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn adult_filter_applies_only_when_requested() {
        let entries = vec![
            ExportEntry { id: 1, adult: false },
            ExportEntry { id: 2, adult: true },
        ];
        assert_eq!(id_set(&entries, true).len(), 1);
        assert_eq!(id_set(&entries, false).len(), 2);
    }
}
