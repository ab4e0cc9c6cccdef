use crate::error::WarehouseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of one shard of the comment dataset, a year (`2007`) or a month (`2015_01`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition(String);

impl Partition {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every shard worth querying: yearly tables up to 2014 (2005 and 2006 hold no matches),
/// monthly tables from 2015 through 2019.
pub fn partitions() -> Vec<Partition> {
    let yearly = (2007..2015).map(|year| Partition(year.to_string()));
    let monthly = (2015..2020)
        .flat_map(|year| (1..=12).map(move |month| Partition(format!("{year}_{month:02}"))));
    yearly.chain(monthly).collect()
}

/// A comment linking to xkcd together with the comment it replied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub body: Option<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub permalink: Option<String>,
    pub xkcd: Option<String>,
    pub parent_body: Option<String>,
    pub parent_author: Option<String>,
    pub parent_score: Option<i64>,
    pub parent_permalink: Option<String>,
}

fn parse_score(column: &str, value: Option<String>) -> Result<Option<i64>, WarehouseError> {
    value
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| WarehouseError::Shape(format!("{column} is not an integer: {v:?}")))
        })
        .transpose()
}

impl CommentRecord {
    /// Builds a record from one result row, matching values to fields by column name.
    /// Columns the record does not know are ignored.
    pub fn from_row(
        columns: &[String],
        values: Vec<Option<String>>,
    ) -> Result<Self, WarehouseError> {
        if columns.len() != values.len() {
            return Err(WarehouseError::Shape(format!(
                "row has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        let mut record = CommentRecord::default();
        for (column, value) in columns.iter().zip(values) {
            match column.as_str() {
                "body" => record.body = value,
                "author" => record.author = value,
                "score" => record.score = parse_score(column, value)?,
                "permalink" => record.permalink = value,
                "xkcd" => record.xkcd = value,
                "parent_body" => record.parent_body = value,
                "parent_author" => record.parent_author = value,
                "parent_score" => record.parent_score = parse_score(column, value)?,
                "parent_permalink" => record.parent_permalink = value,
                _ => {}
            }
        }
        Ok(record)
    }
}

/// Column names plus stringly rows, the way the warehouse hands results back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultTable {
    pub fn into_comments(self) -> Result<Vec<CommentRecord>, WarehouseError> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| CommentRecord::from_row(&columns, row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_list_is_fixed() {
        let all = partitions();
        assert_eq!(all.len(), 8 + 5 * 12);
        assert_eq!(all[0].as_str(), "2007");
        assert_eq!(all[7].as_str(), "2014");
        assert_eq!(all[8].as_str(), "2015_01");
        assert_eq!(all.last().unwrap().as_str(), "2019_12");
    }

    #[test]
    fn rows_map_by_column_name() {
        let columns: Vec<String> = ["score", "body", "extra", "parent_score"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let record = CommentRecord::from_row(
            &columns,
            vec![Some("12".into()), Some("see xkcd.com/927".into()), Some("x".into()), None],
        )
        .unwrap();
        assert_eq!(record.score, Some(12));
        assert_eq!(record.body.as_deref(), Some("see xkcd.com/927"));
        assert_eq!(record.parent_score, None);
        assert_eq!(record.author, None);
    }

    #[test]
    fn bad_scores_are_rejected() {
        let columns = vec!["score".to_string()];
        let err = CommentRecord::from_row(&columns, vec![Some("lots".into())]).unwrap_err();
        assert!(matches!(err, WarehouseError::Shape(_)));
    }
}
