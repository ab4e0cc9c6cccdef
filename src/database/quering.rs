use super::{partitions, BigQueryClient, Partition, ResultTable};
use crate::error::WarehouseError;
use crate::tables::write_table;
use crate::CResult;
use indicatif::ProgressBar;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DATASET: &str = "fh-bigquery.reddit_comments";

/// Pairs every comment that links a comic with its parent. Both sides must have a
/// positive score. `parent_id` carries a `t1_`/`t3_` kind prefix that `id` lacks.
pub static QUERY: &str = r#"
WITH comments AS (
  SELECT * FROM `fh-bigquery.reddit_comments.{table_name}`
)
SELECT self.body body, self.author author, self.score score,
       CONCAT('http://reddit.com/r/', self.subreddit, '/comments/', REGEXP_REPLACE(self.link_id, r't[0-9]_', ''), '/c/', self.id) AS permalink,
       REGEXP_EXTRACT(self.body, r'https?:\/\/(?:(?:w{3}|m)\.)?xkcd\.com\/\d+\/?') AS xkcd,
       parent.body parent_body,
       parent.author parent_author,
       parent.score parent_score,
       CONCAT('http://reddit.com/r/', parent.subreddit, '/comments/', REGEXP_REPLACE(parent.link_id, r't[0-9]_', ''), '/c/', parent.id) AS parent_permalink
FROM comments self, comments parent
WHERE REGEXP_CONTAINS(self.body, r'https?:\/\/(?:(?:www|m)\.)?xkcd\.com\/\d+\/?')
  AND self.score >= 1
  AND parent.score >= 1
  AND REGEXP_REPLACE(self.parent_id, r't[0-9]_', '') = parent.id
"#;

const PLACEHOLDER: &str = "{table_name}";

pub fn render_query(partition: &Partition) -> String {
    QUERY.replace(PLACEHOLDER, partition.as_str())
}

/// Something that takes SQL text and gives back a table.
pub trait QueryEngine {
    fn run_query(&self, sql: &str)
        -> impl Future<Output = Result<ResultTable, WarehouseError>> + Send;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    job_reference: Option<JobReference>,
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

fn cell_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl BigQueryClient {
    async fn read_response(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<QueryResponse, WarehouseError> {
        let response = request.bearer_auth(self.bearer().await?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WarehouseError::Query {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let page: QueryResponse = response.json().await?;
        for problem in &page.errors {
            warn!(message = %problem.message, "warehouse reported a problem");
        }
        Ok(page)
    }

    async fn query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, WarehouseError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.endpoint, self.project, job.job_id
        );
        let mut params = vec![
            ("maxResults", self.page_size.to_string()),
            ("timeoutMs", self.query_timeout.as_millis().to_string()),
        ];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_owned()));
        }
        self.read_response(self.http.get(url).query(&params)).await
    }
}

impl QueryEngine for BigQueryClient {
    async fn run_query(&self, sql: &str) -> Result<ResultTable, WarehouseError> {
        let url = format!("{}/projects/{}/queries", self.endpoint, self.project);
        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "maxResults": self.page_size,
            "timeoutMs": self.query_timeout.as_millis() as u64,
        });
        let mut page = self.read_response(self.http.post(url).json(&body)).await?;

        let job = page
            .job_reference
            .take()
            .ok_or_else(|| WarehouseError::Shape("response without job reference".into()))?;
        while !page.job_complete {
            debug!(job = %job.job_id, "waiting for query job");
            page = self.query_results(&job, None).await?;
        }
        // `errors` may hold warnings of a job that succeeded; a finished job without a
        // result schema is one that failed
        if page.schema.is_none() {
            if let Some(first) = page.errors.first() {
                return Err(WarehouseError::Job {
                    job_id: job.job_id.clone(),
                    message: first.message.clone(),
                });
            }
        }

        let columns: Vec<String> = page
            .schema
            .take()
            .map(|s| s.fields.into_iter().map(|f| f.name).collect())
            .unwrap_or_default();
        let mut table = ResultTable {
            columns,
            rows: Vec::new(),
        };
        loop {
            table.rows.extend(
                std::mem::take(&mut page.rows)
                    .into_iter()
                    .map(|row| row.f.into_iter().map(|c| cell_text(c.v)).collect()),
            );
            match page.page_token.take() {
                Some(token) => page = self.query_results(&job, Some(&token)).await?,
                None => break,
            }
        }
        debug!(job = %job.job_id, rows = table.rows.len(), "query finished");
        Ok(table)
    }
}

/// Runs the query for every partition and writes `<out_dir>/<partition>.csv`.
///
/// Partitions whose file already exists are skipped unless `refresh` is set. The first
/// failing partition ends the run; files written before it stay.
pub async fn harvest_partitions<E: QueryEngine>(
    engine: &E,
    partitions: &[Partition],
    out_dir: &Path,
    refresh: bool,
    progress: &ProgressBar,
) -> CResult<usize> {
    let mut written = 0;
    for partition in partitions {
        let path = out_dir.join(format!("{partition}.csv"));
        if path.exists() && !refresh {
            info!(%partition, "partition already harvested, skipping");
            progress.inc(1);
            continue;
        }
        progress.set_message(partition.to_string());
        info!(%partition, "querying partition");
        let table = engine.run_query(&render_query(partition)).await?;
        let comments = table.into_comments()?;
        write_table(&path, &comments)?;
        written += 1;
        progress.inc(1);
    }
    Ok(written)
}

/// `harvest_partitions` over the full fixed partition list.
pub async fn get_reddit_comments_table<E: QueryEngine>(
    engine: &E,
    out_dir: &Path,
    refresh: bool,
    progress: &ProgressBar,
) -> CResult<usize> {
    let all = partitions();
    progress.set_length(all.len() as u64);
    harvest_partitions(engine, &all, out_dir, refresh, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_partition_renders_cleanly() {
        for partition in partitions() {
            let sql = render_query(&partition);
            assert!(!sql.contains(PLACEHOLDER));
            assert_eq!(sql.matches(partition.as_str()).count(), 1);
            assert_eq!(
                sql.matches(&format!("`{DATASET}.{partition}`")).count(),
                1,
                "{partition}"
            );
            assert!(sql.contains("w{3}"));
        }
    }
}
