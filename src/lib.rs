//! # xkcd harvest
//!
//! Two offline data collection jobs around xkcd, each run start to finish and written to
//! csv files.
//!
//! ## Jobs
//!
//! | Subcommand | Source | Output |
//! |------------|--------|--------|
//! | `reddit`   | public Reddit comment dataset in BigQuery, one query per partition | `<out>/<partition>.csv` |
//! | `wiki`     | explainxkcd.com comic index and explanation pages | `<out>/links.csv`, `<out>/pages.csv` |
//!
//! ### reddit
//!
//! Every comment that links an xkcd comic is paired with the comment it replied to. The
//! dataset is split into yearly (2007-2014) and monthly (2015-2019) tables; each gets its
//! own query and file. Partitions whose file exists are skipped unless `--refresh` is given.
//!
//! ### wiki
//!
//! The two comic index pages become the links table, sorted by comic number. Every title
//! link is then fetched (at most `--concurrency` requests in flight, with retry and
//! backoff on 429/5xx) and its *Explanation* and *Transcript* sections are extracted on a
//! pool of `--workers` threads.
//!
//! ## Usage
//!
//! ```bash
//! ./xkcd-harvest reddit --credentials ~/.config/gcloud_creds.json -o data/reddit
//! ./xkcd-harvest --log-dir logs wiki -c 50 -o data/xkcd
//! ```
//!
//! `RUST_LOG` controls verbosity (default `info`).
mod interface;
pub use interface::{
    get_args, parse_args, run, Config, Job, RedditConfig, WikiConfig, FETCH_CONCURRENCY,
    FIRST_BATCH_URL, FULL_LISTING_URL,
};
mod error;
pub use error::*;
mod database;
pub use database::*;
mod page_utils;
pub use page_utils::*;
mod tables;
pub use tables::*;
mod go_spider;
pub use go_spider::{run_reddit, run_wiki, WikiSummary};
mod log_creation;
pub use log_creation::*;
