//! # ca-cli — The "Console" of CrashArchive
//!
//! Command-line client for a running `ca-hub`.
//!
//! - `crashctl list [filters]`: Search the archive.
//! - `crashctl similar <id>`: Reports from the same crash site.
//! - `crashctl versions`: Versions seen in the archive.
//! - `crashctl import --db <path> <file>`: Load NDJSON reports into a database.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tabled::{Table, Tabled};

use ca_store::{NewReport, SqliteStore};

/// CrashArchive report browser.
#[derive(Parser)]
#[command(name = "crashctl", version, about, long_about = None)]
struct Cli {
    /// Hub base URL.
    #[arg(long, env = "CA_BASE_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search reports.
    List(ListArgs),

    /// List reports that crashed at the same site as a given report.
    Similar {
        id: u64,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Print the versions seen in the archive.
    Versions,

    /// Import newline-delimited JSON reports into a database file.
    Import {
        /// Path to the report database.
        #[arg(long, default_value = "crash_reports.db")]
        db: PathBuf,

        /// One JSON report per line.
        file: PathBuf,
    },
}

#[derive(Args, Default)]
struct ListArgs {
    /// Lowest report id (inclusive).
    #[arg(long)]
    min: Option<u64>,
    /// Highest report id (inclusive).
    #[arg(long)]
    max: Option<u64>,
    /// Substring of the crash message.
    #[arg(long)]
    message: Option<String>,
    /// Substring of the error type.
    #[arg(long)]
    errortype: Option<String>,
    /// core, plugin or plugin_indirect. Repeatable.
    #[arg(long)]
    cause: Vec<String>,
    /// Exact blamed plugin.
    #[arg(long)]
    plugin: Option<String>,
    /// Build number.
    #[arg(long)]
    build: Option<u64>,
    /// greater or less. Omitted means equal.
    #[arg(long)]
    buildtype: Option<String>,
    /// Acceptable version. Repeatable.
    #[arg(long)]
    versions: Vec<String>,
    /// Include reports flagged as duplicates.
    #[arg(long)]
    duplicates: bool,
    #[command(flatten)]
    page: PageArgs,
}

#[derive(Args, Default)]
struct PageArgs {
    #[arg(long)]
    page: Option<u64>,
    #[arg(long)]
    pagesize: Option<u64>,
}

impl PageArgs {
    fn push_pairs(&self, pairs: &mut Vec<(&'static str, String)>) {
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.pagesize {
            pairs.push(("pagesize", size.to_string()));
        }
    }
}

impl ListArgs {
    /// Query-string pairs understood by `/api/reports`.
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.duplicates {
            pairs.push(("duplicates", "true".to_string()));
        }
        if let Some(min) = self.min {
            pairs.push(("min", min.to_string()));
        }
        if let Some(max) = self.max {
            pairs.push(("max", max.to_string()));
        }
        if let Some(message) = &self.message {
            pairs.push(("message", message.clone()));
        }
        if let Some(errortype) = &self.errortype {
            pairs.push(("errortype", errortype.clone()));
        }
        for cause in &self.cause {
            pairs.push(("cause", cause.clone()));
        }
        if let Some(plugin) = &self.plugin {
            pairs.push(("plugin", plugin.clone()));
        }
        if let Some(build) = self.build {
            pairs.push(("build", build.to_string()));
            if let Some(buildtype) = &self.buildtype {
                pairs.push(("buildtype", buildtype.clone()));
            }
        }
        for version in &self.versions {
            pairs.push(("versions", version.clone()));
        }
        self.page.push_pairs(&mut pairs);
        pairs
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize, Tabled)]
struct ReportRow {
    id: u64,
    version: String,
    plugin: String,
    message: String,
    resolved: bool,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    rows: Vec<ReportRow>,
    total_matches: u64,
    page_number: u64,
    range_start: u64,
    page_count: u64,
}

impl ListResponse {
    fn summary(&self) -> String {
        if self.rows.is_empty() {
            return format!("no matching reports (page {})", self.page_number);
        }
        format!(
            "showing {}-{} of {} (page {} of {})",
            self.range_start + 1,
            self.range_start + self.rows.len() as u64,
            self.total_matches,
            self.page_number,
            self.page_count
        )
    }
}

#[derive(Debug, Deserialize)]
struct VersionsResponse {
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base_url = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Commands::List(args) => {
            let url = format!("{}/api/reports", base_url);
            let page: ListResponse = get_json(&client, &url, &args.to_pairs()).await?;
            print_page(&page);
        }
        Commands::Similar { id, page } => {
            let url = format!("{}/api/reports/{}/similar", base_url, id);
            let mut pairs = Vec::new();
            page.push_pairs(&mut pairs);
            let page: ListResponse = get_json(&client, &url, &pairs).await?;
            print_page(&page);
        }
        Commands::Versions => {
            let url = format!("{}/api/versions", base_url);
            let resp: VersionsResponse = get_json(&client, &url, &[]).await?;
            for version in resp.versions {
                println!("{}", version);
            }
        }
        Commands::Import { db, file } => {
            let reports = read_reports(&file)?;
            let store = SqliteStore::open(&db)
                .with_context(|| format!("opening database {}", db.display()))?;
            let ids = store.insert_all(reports).await?;
            eprintln!("Imported {} reports into {}", ids.len(), db.display());
        }
    }
    Ok(())
}

fn print_page(page: &ListResponse) {
    if !page.rows.is_empty() {
        println!("{}", Table::new(&page.rows));
    }
    println!("{}", page.summary());
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&'static str, String)],
) -> anyhow::Result<T> {
    let resp = client
        .get(url)
        .query(query)
        .send()
        .await
        .with_context(|| format!("requesting {}", url))?;

    let status = resp.status();
    if !status.is_success() {
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        bail!("{} ({})", message, status);
    }
    Ok(resp.json::<T>().await?)
}

/// Parse one [`NewReport`] per non-blank line.
fn read_reports(path: &Path) -> anyhow::Result<Vec<NewReport>> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_reports(std::io::BufReader::new(file))
}

fn parse_reports<R: BufRead>(reader: R) -> anyhow::Result<Vec<NewReport>> {
    let mut reports = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let report = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid report", index + 1))?;
        reports.push(report);
    }
    Ok(reports)
}
