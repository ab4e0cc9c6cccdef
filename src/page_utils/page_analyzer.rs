//! CPU bound half of the pipeline: turns fetched pages into page records on a rayon pool
//! sized independently of the fetch pool.
use super::{process_page_contents, PageRecord, PageResponse};
use crate::CResult;
use indicatif::ProgressBar;
use rayon::{prelude::*, ThreadPoolBuilder};

/// Parses `pages` on `workers` threads. Record i belongs to page i.
pub fn analyze_pages(
    pages: &[PageResponse],
    workers: usize,
    progress: &ProgressBar,
) -> CResult<Vec<PageRecord>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("parse-{i}"))
        .build()?;

    let records = pool.install(|| {
        pages
            .par_iter()
            .map(|page| {
                let record = process_page_contents(page);
                progress.inc(1);
                record
            })
            .collect::<Result<Vec<_>, _>>()
    })?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{header::HeaderMap, StatusCode, Url};

    fn page(n: usize) -> PageResponse {
        PageResponse {
            url: Url::parse(&format!("https://www.explainxkcd.com/wiki/index.php/{n}")).unwrap(),
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: format!(
                r#"<div id="mw-content-text"><h2>Explanation</h2><p>comic {n}</p></div>"#
            ),
        }
    }

    #[test]
    fn records_keep_page_order() {
        let pages: Vec<_> = (1..=64).map(page).collect();
        let records = analyze_pages(&pages, 4, &ProgressBar::hidden()).unwrap();
        assert_eq!(records.len(), 64);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.explanation, format!("comic {}", i + 1));
            assert!(record.title.ends_with(&format!("/{}", i + 1)));
        }
    }

    #[test]
    fn one_broken_page_fails_the_phase() {
        let mut pages: Vec<_> = (1..=3).map(page).collect();
        pages[1].body = "<p>down for maintenance</p>".into();
        assert!(analyze_pages(&pages, 2, &ProgressBar::hidden()).is_err());
    }
}
