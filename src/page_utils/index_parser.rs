//! comic index pages: one `wikitable` with a row per comic
use super::PageFetcher;
use crate::{error::ExtractError, CResult};
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::info;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.wikitable").expect("table selector"));
static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("row selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("anchor selector"));

/// A table cell is either the href of its first link or, for placeholder rows, its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Link(String),
    Text(String),
}

impl Cell {
    pub fn link(&self) -> Option<&str> {
        match self {
            Cell::Link(href) => Some(href),
            Cell::Text(_) => None,
        }
    }
    pub fn as_str(&self) -> &str {
        match self {
            Cell::Link(s) | Cell::Text(s) => s,
        }
    }
}

/// Index row as found on the page, columns in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLinkRow {
    pub xkcd: Option<Cell>,
    pub title: Option<Cell>,
    pub talk: Option<Cell>,
    pub image: Option<Cell>,
    pub date: Option<Cell>,
    /// anchor text of the title cell, kept apart from the link
    pub title_text: Option<String>,
}

fn cell_value(cell: ElementRef) -> Cell {
    match cell.select(&ANCHOR).next() {
        Some(anchor) => Cell::Link(anchor.value().attr("href").unwrap_or("").to_owned()),
        None => Cell::Text(cell.text().collect::<String>().trim().to_owned()),
    }
}

fn row_cells(row: ElementRef) -> Vec<ElementRef> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

/// Parses the first `wikitable` of an index page, skipping its header row.
pub fn parse_index_table(html: &str, url: &Url) -> Result<Vec<RawLinkRow>, ExtractError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&TABLE)
        .next()
        .ok_or_else(|| ExtractError::IndexTableMissing {
            url: url.to_string(),
        })?;

    let rows = table
        .select(&ROWS)
        .skip(1)
        .map(|tr| {
            let cells = row_cells(tr);
            let title_text = cells
                .get(1)
                .and_then(|cell| cell.select(&ANCHOR).next())
                .map(|a| a.text().collect::<String>().trim().to_owned())
                .filter(|text| !text.is_empty());
            let mut values = cells.into_iter().map(cell_value);
            RawLinkRow {
                xkcd: values.next(),
                title: values.next(),
                talk: values.next(),
                image: values.next(),
                date: values.next(),
                title_text,
            }
        })
        .collect();
    Ok(rows)
}

/// Fetches one index page and returns its rows.
pub async fn gather_wiki_links(fetcher: &PageFetcher, url: &Url) -> CResult<Vec<RawLinkRow>> {
    let page = fetcher.get_page(url).await?;
    let rows = parse_index_table(page.get_raw_page(), url)?;
    info!(%url, rows = rows.len(), "parsed index page");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"<html><body>
    <table class="wikitable sortable">
      <tr><th>XKCD</th><th>Title</th><th>Talk</th><th>Image</th><th>Date</th></tr>
      <tr>
        <td><a href="https://xkcd.com/1">1</a></td>
        <td><a href="/wiki/index.php/1:_Barrel_-_Part_1" title="1: Barrel - Part 1"> Barrel - Part 1 </a></td>
        <td><a href="/wiki/index.php/Talk:1:_Barrel_-_Part_1">Talk</a></td>
        <td><a href="/wiki/images/c/c5/barrel_cropped_%281%29.jpg">barrel_cropped_(1).jpg</a></td>
        <td>2006-01-01</td>
      </tr>
      <tr><td><a href="https://xkcd.com/404">404</a></td><td> Not found </td><td>Talk</td><td> none </td><td>Unknown</td></tr>
    </table></body></html>"#;

    fn url() -> Url {
        Url::parse("https://www.explainxkcd.com/wiki/index.php/List_of_all_comics_(1-500)")
            .unwrap()
    }

    #[test]
    fn rows_follow_the_header() {
        let rows = parse_index_table(INDEX, &url()).unwrap();
        assert_eq!(rows.len(), 2);
        let first = &rows[0];
        assert_eq!(first.xkcd, Some(Cell::Link("https://xkcd.com/1".into())));
        assert_eq!(
            first.title,
            Some(Cell::Link("/wiki/index.php/1:_Barrel_-_Part_1".into()))
        );
        assert_eq!(first.date, Some(Cell::Text("2006-01-01".into())));
        assert_eq!(first.title_text.as_deref(), Some("Barrel - Part 1"));
    }

    #[test]
    fn cells_without_links_become_text() {
        let rows = parse_index_table(INDEX, &url()).unwrap();
        let placeholder = &rows[1];
        assert_eq!(placeholder.title, Some(Cell::Text("Not found".into())));
        assert_eq!(placeholder.image, Some(Cell::Text("none".into())));
        assert_eq!(placeholder.title_text, None);
    }

    #[test]
    fn blank_anchor_text_is_no_title_text() {
        let html = r#"<table class="wikitable">
          <tr><th>XKCD</th><th>Title</th></tr>
          <tr><td><a href="https://xkcd.com/7">7</a></td><td><a href="/wiki/index.php/7:_Girl">  </a></td></tr>
        </table>"#;
        let rows = parse_index_table(html, &url()).unwrap();
        assert_eq!(rows[0].title, Some(Cell::Link("/wiki/index.php/7:_Girl".into())));
        assert_eq!(rows[0].title_text, None);
    }

    #[test]
    fn page_without_table_is_an_error() {
        let err = parse_index_table("<p>nothing here</p>", &url()).unwrap_err();
        assert!(matches!(err, ExtractError::IndexTableMissing { .. }));
    }
}
