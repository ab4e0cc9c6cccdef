use thiserror::Error;

pub type CResult<T> = Result<T, HarvestError>;

/// Failures of the retrying page fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("giving up on {url} after {attempts} attempts, last status {status}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        status: u16,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("fetch pool shut down: {0}")]
    PoolClosed(#[from] tokio::sync::AcquireError),
    #[error("fetch worker failed: {0}")]
    Worker(tokio::task::JoinError),
}

/// Failures while pulling sections or index rows out of a page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing expected section container on {url}")]
    MissingSectionContainer { url: String },
    #[error("no wikitable found on index page {url}")]
    IndexTableMissing { url: String },
    #[error("could not resolve link {link:?} against {base}")]
    BadLink { base: String, link: String },
}

/// Failures talking to the analytics warehouse.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("could not read credentials at {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed credentials: {0}")]
    MalformedCredentials(String),
    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },
    #[error("query failed with status {status}: {body}")]
    Query { status: u16, body: String },
    #[error("job {job_id} reported an error: {message}")]
    Job { job_id: String, message: String },
    #[error("unexpected result shape: {0}")]
    Shape(String),
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Url Error: {0}")]
    Url(#[from] url::ParseError),
    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
    #[error("could not build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
