use super::{
    gather_all_links, get_all_page_contents, get_reddit_comments_table, progress_bar, read_table,
    valid_url_format, write_table, BigQueryClient, CResult, LinkRecord, PageFetcher,
    RedditConfig, WikiConfig,
};
use reqwest::Url;
use tracing::info;

/// What a wiki run produced. `pages` is `None` when an existing pages.csv was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WikiSummary {
    pub links: usize,
    pub links_fetched: bool,
    pub pages: Option<usize>,
}

/// Scrapes the explanation wiki into `links.csv` and `pages.csv`.
///
/// Each table is rebuilt only when its file is missing or a refresh was asked for; an
/// existing links table is loaded and feeds the page phase.
pub async fn run_wiki(config: &WikiConfig) -> CResult<WikiSummary> {
    let fetcher = PageFetcher::new(config.retry.clone())?;
    let links_path = config.get_links_path();
    let pages_path = config.get_pages_path();

    let links_fetched = config.refresh_links || !links_path.exists();
    let links: Vec<LinkRecord> = if links_fetched {
        let links = gather_all_links(
            &fetcher,
            &config.first_batch_url,
            &config.full_listing_url,
            &config.base_url,
        )
        .await?;
        write_table(&links_path, &links)?;
        links
    } else {
        info!(path = %links_path.display(), "reusing links table");
        read_table(&links_path)?
    };

    let pages = if config.refresh_pages || !pages_path.exists() {
        let urls = links
            .iter()
            .map(|link| valid_url_format(&link.title))
            .collect::<CResult<Vec<Url>>>()?;
        let records = get_all_page_contents(
            &fetcher,
            &urls,
            config.fetch_concurrency,
            config.parse_workers,
        )
        .await?;
        write_table(&pages_path, &records)?;
        Some(records.len())
    } else {
        info!(path = %pages_path.display(), "pages table already present");
        None
    };

    Ok(WikiSummary {
        links: links.len(),
        links_fetched,
        pages,
    })
}

/// Runs the comment query for every partition; returns how many files were written.
pub async fn run_reddit(config: &RedditConfig) -> CResult<usize> {
    let client = BigQueryClient::connect(&config.warehouse).await?;
    let bar = progress_bar(0, "Partitions");
    let written =
        get_reddit_comments_table(&client, &config.out_dir, config.refresh, &bar).await?;
    bar.finish_and_clear();
    info!(written, out = %config.out_dir.display(), "reddit harvest done");
    Ok(written)
}
