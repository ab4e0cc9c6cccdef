use super::{analyze_pages, fetch_pages, PageFetcher, PageRecord};
use crate::{progress_bar, CResult};
use reqwest::Url;
use tracing::info;

/// Fetch every url on the I/O pool, then parse every page on the CPU pool.
///
/// Both phases keep input order, so record i is the page behind `urls[i]`. Nothing is
/// kept if either phase fails.
pub async fn get_all_page_contents(
    fetcher: &PageFetcher,
    urls: &[Url],
    concurrency: usize,
    workers: usize,
) -> CResult<Vec<PageRecord>> {
    info!(pages = urls.len(), concurrency, "fetching pages");
    let fetch_bar = progress_bar(urls.len() as u64, "Getting page");
    let pages = fetch_pages(fetcher, urls, concurrency, &fetch_bar).await?;
    fetch_bar.finish_and_clear();

    info!(pages = pages.len(), workers, "processing pages");
    let parse_bar = progress_bar(pages.len() as u64, "Processing page");
    let records = tokio::task::spawn_blocking(move || {
        let records = analyze_pages(&pages, workers, &parse_bar);
        parse_bar.finish_and_clear();
        records
    })
    .await??;
    info!(records = records.len(), "pages processed");
    Ok(records)
}
