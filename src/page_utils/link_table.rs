//! the links table: index rows merged, made absolute, dated and ordered by comic number
use super::{gather_wiki_links, resolve_link, Cell, PageFetcher, RawLinkRow};
use crate::{error::ExtractError, CResult};
use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%B %d, %Y", "%d %B %Y"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub xkcd: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Image")]
    pub image: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "TitleText")]
    pub title_text: Option<String>,
}

impl LinkRecord {
    pub fn comic_number(&self) -> Option<u32> {
        comic_number(&self.xkcd)
    }
}

/// Integer at the end of a comic link's path, `https://xkcd.com/614/` gives 614.
pub fn comic_number(xkcd: &str) -> Option<u32> {
    let path = match Url::parse(xkcd) {
        Ok(url) => url.path().to_owned(),
        Err(_) => xkcd.to_owned(),
    };
    path.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

/// Unknown or malformed dates become `None`.
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Cuts a title path at its first colon. Some titles carry characters the wiki cannot
/// route, while the bare number always redirects to the right page.
pub fn strip_colon_suffix(mut url: Url) -> Url {
    let path = url.path().split(':').next().unwrap_or_default().to_owned();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Turns raw index rows into link records, dropping rows that have no title link.
pub fn into_link_records(rows: Vec<RawLinkRow>) -> Vec<LinkRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let title = match row.title.as_ref().and_then(Cell::link) {
                Some(href) if !href.is_empty() => href.to_owned(),
                _ => {
                    debug!(?row, "dropping index row without a title link");
                    return None;
                }
            };
            Some(LinkRecord {
                xkcd: row.xkcd.as_ref().map(Cell::as_str).unwrap_or_default().to_owned(),
                title,
                image: row.image.as_ref().and_then(Cell::link).map(str::to_owned),
                date: row.date.as_ref().and_then(|d| coerce_date(d.as_str())),
                title_text: row.title_text,
            })
        })
        .collect()
}

/// Resolves links against `base`, strips title suffixes and sorts by comic number.
///
/// Running it on its own output changes nothing.
pub fn normalize_links(
    records: Vec<LinkRecord>,
    base: &Url,
) -> Result<Vec<LinkRecord>, ExtractError> {
    let mut normalized = Vec::with_capacity(records.len());
    for mut record in records {
        let Some(number) = record.comic_number() else {
            warn!(xkcd = %record.xkcd, title = %record.title, "dropping row without a comic number");
            continue;
        };
        record.title = strip_colon_suffix(resolve_link(base, &record.title)?).to_string();
        record.image = record
            .image
            .map(|image| resolve_link(base, &image).map(|u| u.to_string()))
            .transpose()?;
        normalized.push((number, record));
    }
    normalized.sort_by_key(|(number, _)| *number);
    Ok(normalized.into_iter().map(|(_, record)| record).collect())
}

/// Builds the full links table from the first-batch page and the full listing.
pub async fn gather_all_links(
    fetcher: &PageFetcher,
    first_batch: &Url,
    full_listing: &Url,
    base: &Url,
) -> CResult<Vec<LinkRecord>> {
    let mut rows = gather_wiki_links(fetcher, first_batch).await?;
    rows.extend(gather_wiki_links(fetcher, full_listing).await?);
    let links = normalize_links(into_link_records(rows), base)?;
    info!(links = links.len(), "links table ready");
    Ok(links)
}
