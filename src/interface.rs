use crate::{run_reddit, run_wiki, RetryPolicy, WarehouseConfig, BASE_URL, CPU_NUMBER};
use clap::{command, value_parser, Arg, ArgAction, ArgMatches, Command};
use once_cell::sync::Lazy;
use reqwest::Url;
use std::ffi::OsString;
use std::path::PathBuf;

const HELP: &str = r#"
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading}
    {usage}

{all-args}{after-help}
"#;

pub const FIRST_BATCH_URL: &str =
    "https://www.explainxkcd.com/wiki/index.php/List_of_all_comics_(1-500)";
pub const FULL_LISTING_URL: &str =
    "https://www.explainxkcd.com/wiki/index.php/List_of_all_comics_(full)";
pub const FETCH_CONCURRENCY: usize = 50;

static FIRST_BATCH: Lazy<Url> =
    Lazy::new(|| Url::parse(FIRST_BATCH_URL).expect("static first batch url is valid"));
static FULL_LISTING: Lazy<Url> =
    Lazy::new(|| Url::parse(FULL_LISTING_URL).expect("static full listing url is valid"));

/// Settings of the explainxkcd scrape.
#[derive(Debug, Clone)]
pub struct WikiConfig {
    pub out_dir: PathBuf,
    pub refresh_links: bool,
    pub refresh_pages: bool,
    pub fetch_concurrency: usize, // requests in flight during the fetch phase
    pub parse_workers: usize,     // threads of the parse phase
    pub retry: RetryPolicy,
    pub base_url: Url,
    // the first 500 comics are missing from the full listing, hence two pages
    pub first_batch_url: Url,
    pub full_listing_url: Url,
}

impl WikiConfig {
    pub fn new(out_dir: PathBuf) -> Self {
        Self {
            out_dir,
            refresh_links: false,
            refresh_pages: false,
            fetch_concurrency: FETCH_CONCURRENCY,
            parse_workers: *CPU_NUMBER,
            retry: RetryPolicy::default(),
            base_url: BASE_URL.clone(),
            first_batch_url: FIRST_BATCH.clone(),
            full_listing_url: FULL_LISTING.clone(),
        }
    }
    pub fn get_links_path(&self) -> PathBuf {
        self.out_dir.join("links.csv")
    }
    pub fn get_pages_path(&self) -> PathBuf {
        self.out_dir.join("pages.csv")
    }
}

/// Settings of the Reddit comment harvest.
#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub out_dir: PathBuf,
    pub refresh: bool,
    pub warehouse: WarehouseConfig,
}

#[derive(Debug, Clone)]
pub enum Job {
    Reddit(RedditConfig),
    Wiki(WikiConfig),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_dir: Option<PathBuf>,
    pub job: Job,
}

/// `~/.config/gcloud_creds.json`, used when neither the flag nor the env var is set
fn default_credentials() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("gcloud_creds.json"))
        .unwrap_or_else(|| PathBuf::from("gcloud_creds.json"))
}

fn cli() -> Command {
    command!()
        .about("Harvests xkcd references from Reddit and explanations from explainxkcd")
        .help_template(HELP)
        .next_line_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("log_dir")
                .long("log-dir")
                .global(true)
                .num_args(1)
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .long_help("also write the log to DIR/harvest.log"),
        )
        .subcommand(
            Command::new("reddit")
                .about("query the comment warehouse, one csv per partition")
                .arg(
                    Arg::new("credentials")
                        .long("credentials")
                        .env("GOOGLE_APPLICATION_CREDENTIALS")
                        .num_args(1)
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .long_help("service account key used to reach the warehouse"),
                )
                .arg(
                    Arg::new("project")
                        .long("project")
                        .num_args(1)
                        .value_name("ID")
                        .long_help("project billed for the queries, defaults to the key's project"),
                )
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .num_args(1)
                        .value_name("DIR")
                        .value_parser(value_parser!(PathBuf))
                        .default_value("data/reddit"),
                )
                .arg(
                    Arg::new("refresh")
                        .long("refresh")
                        .action(ArgAction::SetTrue)
                        .long_help("query partitions whose csv already exists again"),
                ),
        )
        .subcommand(
            Command::new("wiki")
                .about("scrape the comic index and every explanation page")
                .arg(
                    Arg::new("out")
                        .short('o')
                        .long("out")
                        .num_args(1)
                        .value_name("DIR")
                        .value_parser(value_parser!(PathBuf))
                        .default_value("data/xkcd"),
                )
                .arg(
                    Arg::new("refresh_links")
                        .long("refresh-links")
                        .action(ArgAction::SetTrue)
                        .long_help("rebuild links.csv even if it exists"),
                )
                .arg(
                    Arg::new("refresh_pages")
                        .long("refresh-pages")
                        .action(ArgAction::SetTrue)
                        .long_help("rebuild pages.csv even if it exists"),
                )
                .arg(
                    Arg::new("concurrency")
                        .short('c')
                        .long("concurrency")
                        .num_args(1)
                        .value_name("NUMBER")
                        .value_parser(value_parser!(usize))
                        .long_help("requests in flight while fetching pages (default 50)"),
                )
                .arg(
                    Arg::new("workers")
                        .short('w')
                        .long("workers")
                        .num_args(1)
                        .value_name("NUMBER")
                        .value_parser(value_parser!(usize))
                        .long_help("threads parsing pages (default: number of cpus)"),
                ),
        )
}

fn out_dir(matches: &ArgMatches, fallback: &str) -> PathBuf {
    matches
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(fallback))
}

fn config_from(matches: &ArgMatches) -> Config {
    let log_dir = matches.get_one::<PathBuf>("log_dir").cloned();
    let job = match matches.subcommand() {
        Some(("reddit", sub)) => {
            let credentials = sub
                .get_one::<PathBuf>("credentials")
                .cloned()
                .unwrap_or_else(default_credentials);
            let mut warehouse = WarehouseConfig::new(credentials);
            warehouse.project_id = sub.get_one::<String>("project").cloned();
            Job::Reddit(RedditConfig {
                out_dir: out_dir(sub, "data/reddit"),
                refresh: sub.get_flag("refresh"),
                warehouse,
            })
        }
        // subcommand_required leaves "wiki" as the only other case
        _ => {
            let sub = matches.subcommand_matches("wiki").unwrap_or(matches);
            let mut wiki = WikiConfig::new(out_dir(sub, "data/xkcd"));
            wiki.refresh_links = sub.get_flag("refresh_links");
            wiki.refresh_pages = sub.get_flag("refresh_pages");
            if let Some(n) = sub.get_one::<usize>("concurrency") {
                wiki.fetch_concurrency = *n;
            }
            if let Some(n) = sub.get_one::<usize>("workers") {
                wiki.parse_workers = *n;
            }
            Job::Wiki(wiki)
        }
    };
    Config { log_dir, job }
}

pub fn parse_args<I, T>(args: I) -> Result<Config, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = cli().try_get_matches_from(args)?;
    Ok(config_from(&matches))
}

pub fn get_args() -> Config {
    config_from(&cli().get_matches())
}

pub async fn run(config: Config) -> crate::CResult<()> {
    match config.job {
        Job::Reddit(reddit) => {
            run_reddit(&reddit).await?;
        }
        Job::Wiki(wiki) => {
            run_wiki(&wiki).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiki_defaults() {
        let config = parse_args(["xkcd-harvest", "wiki"]).unwrap();
        let Job::Wiki(wiki) = config.job else {
            panic!("expected the wiki job");
        };
        assert_eq!(wiki.out_dir, PathBuf::from("data/xkcd"));
        assert_eq!(wiki.fetch_concurrency, 50);
        assert_eq!(wiki.parse_workers, *CPU_NUMBER);
        assert!(!wiki.refresh_links && !wiki.refresh_pages);
        assert_eq!(wiki.first_batch_url.as_str(), FIRST_BATCH_URL);
        assert_eq!(wiki.full_listing_url.as_str(), FULL_LISTING_URL);
        assert_ne!(wiki.first_batch_url, wiki.full_listing_url);
    }

    #[test]
    fn wiki_flags() {
        let config = parse_args([
            "xkcd-harvest",
            "--log-dir",
            "logs",
            "wiki",
            "--refresh-pages",
            "-c",
            "8",
            "-w",
            "2",
            "-o",
            "out",
        ])
        .unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("logs")));
        let Job::Wiki(wiki) = config.job else {
            panic!("expected the wiki job");
        };
        assert!(wiki.refresh_pages);
        assert!(!wiki.refresh_links);
        assert_eq!(wiki.fetch_concurrency, 8);
        assert_eq!(wiki.parse_workers, 2);
        assert_eq!(wiki.get_pages_path(), PathBuf::from("out/pages.csv"));
    }

    #[test]
    fn reddit_takes_explicit_credentials() {
        let config = parse_args([
            "xkcd-harvest",
            "reddit",
            "--credentials",
            "/tmp/key.json",
            "--project",
            "billing",
            "--refresh",
        ])
        .unwrap();
        let Job::Reddit(reddit) = config.job else {
            panic!("expected the reddit job");
        };
        assert_eq!(reddit.warehouse.credentials_path, PathBuf::from("/tmp/key.json"));
        assert_eq!(reddit.warehouse.project_id.as_deref(), Some("billing"));
        assert!(reddit.refresh);
        assert_eq!(reddit.out_dir, PathBuf::from("data/reddit"));
    }

    #[test]
    fn a_subcommand_is_required() {
        assert!(parse_args(["xkcd-harvest"]).is_err());
    }
}
