use crate::{error::ExtractError, CResult};
use num_cpus::get as get_logical;
use once_cell::sync::Lazy;
use reqwest::{header::HeaderMap, StatusCode, Url};
use serde::{Deserialize, Serialize};

pub static CPU_NUMBER: Lazy<usize> = Lazy::new(get_logical);

pub static BASE_URL: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://www.explainxkcd.com").expect("static base url is valid")
});

pub fn valid_url_format(url: &str) -> CResult<Url> {
    let parsed = Url::parse(url)?;
    Ok(parsed)
}

/// Resolves a possibly relative link against `base`. Absolute links come back unchanged.
pub fn resolve_link(base: &Url, link: &str) -> Result<Url, ExtractError> {
    base.join(link).map_err(|_| ExtractError::BadLink {
        base: base.to_string(),
        link: link.to_owned(),
    })
}

/// Raw answer of one GET, kept whole so the parse phase can run on another thread.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl PageResponse {
    pub fn get_url(&self) -> &Url {
        &self.url
    }
    pub fn get_raw_page(&self) -> &str {
        &self.body
    }
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// One row of the pages table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Explanation")]
    pub explanation: String,
    #[serde(rename = "Transcript")]
    pub transcript: String,
}

impl PageRecord {
    pub fn empty(url: &Url) -> Self {
        Self {
            title: url.to_string(),
            explanation: String::new(),
            transcript: String::new(),
        }
    }
}
