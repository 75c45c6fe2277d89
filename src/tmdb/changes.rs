//! Paginated `/changes` delta feed.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{Family, TmdbClient, TmdbError};

#[derive(Debug, Default, Deserialize)]
pub struct ChangesPage {
    #[serde(default)]
    pub results: Vec<ChangedId>,
    #[serde(default = "one")]
    pub total_pages: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct ChangedId {
    pub id: i64,
    #[serde(default)]
    pub adult: bool,
}

/// All changed ids inside the window, in upstream page order, adult entries
/// dropped, duplicates collapsed.
pub async fn fetch_changed_ids(
    client: &TmdbClient,
    family: Family,
    start_date: NaiveDate,
    end_date: NaiveDate,
    cancel: &CancellationToken,
) -> Result<Vec<i64>, TmdbError> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    let mut page = 1u32;
    let mut total_pages = 1u32;

    while page <= total_pages {
        let data = client
            .fetch_changes_page(family, start_date, end_date, page, cancel)
            .await?;
        total_pages = data.total_pages.max(1);
        for item in data.results {
            if !item.adult && seen.insert(item.id) {
                ids.push(item.id);
            }
        }
        page += 1;
    }

    Ok(ids)
}
