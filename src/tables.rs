//! csv persistence for every output table
use crate::{CResult, CommentRecord, LinkRecord, PageRecord};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, create_dir_all};
use std::path::Path;
use tracing::info;

/// Row type of an output table, with its header in column order.
pub trait Table: Serialize + DeserializeOwned {
    const COLUMNS: &'static [&'static str];
}

impl Table for CommentRecord {
    const COLUMNS: &'static [&'static str] = &[
        "body",
        "author",
        "score",
        "permalink",
        "xkcd",
        "parent_body",
        "parent_author",
        "parent_score",
        "parent_permalink",
    ];
}

impl Table for LinkRecord {
    const COLUMNS: &'static [&'static str] = &["xkcd", "Title", "Image", "Date", "TitleText"];
}

impl Table for PageRecord {
    const COLUMNS: &'static [&'static str] = &["Title", "Explanation", "Transcript"];
}

/// Writes `rows` to `path` with a header line, even when there are no rows.
///
/// The file appears under its final name only once it is complete, so an interrupted run
/// never leaves something the existence checks would mistake for output.
pub fn write_table<T: Table>(path: &Path, rows: &[T]) -> CResult<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let partial = path.with_extension("csv.partial");
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&partial)?;
        writer.write_record(T::COLUMNS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&partial, path)?;
    info!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

pub fn read_table<T: Table>(path: &Path) -> CResult<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    info!(path = %path.display(), rows = rows.len(), "loaded table");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_tables_still_get_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2007.csv");
        write_table::<CommentRecord>(&path, &[]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim_end(),
            "body,author,score,permalink,xkcd,parent_body,parent_author,parent_score,parent_permalink"
        );
        assert!(!dir.path().join("2007.csv.partial").exists());
    }

    #[test]
    fn links_read_back_with_nulls_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("links.csv");
        let links = vec![
            LinkRecord {
                xkcd: "https://xkcd.com/1".into(),
                title: "https://www.explainxkcd.com/wiki/index.php/1".into(),
                image: Some("https://www.explainxkcd.com/wiki/images/1.jpg".into()),
                date: NaiveDate::from_ymd_opt(2006, 1, 1),
                title_text: Some("Barrel - Part 1".into()),
            },
            LinkRecord {
                xkcd: "https://xkcd.com/2".into(),
                title: "https://www.explainxkcd.com/wiki/index.php/2".into(),
                image: None,
                date: None,
                title_text: None,
            },
        ];
        write_table(&path, &links).unwrap();
        let back: Vec<LinkRecord> = read_table(&path).unwrap();
        assert_eq!(back, links);
    }

    #[test]
    fn multiline_sections_survive_the_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.csv");
        let pages = vec![PageRecord {
            title: "https://www.explainxkcd.com/wiki/index.php/1".into(),
            explanation: "line one,\n\"quoted\" line two\n".into(),
            transcript: String::new(),
        }];
        write_table(&path, &pages).unwrap();
        let back: Vec<PageRecord> = read_table(&path).unwrap();
        assert_eq!(back, pages);
    }
}
