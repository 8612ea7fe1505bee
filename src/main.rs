use clap::{Parser, ValueEnum};
use metallum_crawler::metallum::{self, albums_schema, write_albums};
use metallum_crawler::{
    Browser, CrawlPolicy, CrawlerError, Credentials, HttpBrowser, MetallumScraper, MySqlWriter,
    RetryPolicy, Snapshot, SqliteWriter, UpsertWriter,
};
use std::{fs::OpenOptions, path::PathBuf, sync::Mutex, time::Duration};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Plain HTTP requests, server-rendered markup only
    Http,
    /// Headless Chromium (default with the `browser` feature)
    Chrome,
}

#[cfg(feature = "browser")]
const DEFAULT_ENGINE: Engine = Engine::Chrome;
#[cfg(not(feature = "browser"))]
const DEFAULT_ENGINE: Engine = Engine::Http;

/// Collects highly rated albums of the given countries from Encyclopaedia
/// Metallum and upserts them into a database table.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Country names, exactly as listed on the site
    #[arg(required = true)]
    countries: Vec<String>,

    /// Keep releases rated at least this much
    #[arg(long, default_value_t = 85)]
    min_rating: u32,

    /// One line: host user password database
    #[arg(long, default_value = "database_credentials.txt")]
    credentials: PathBuf,

    #[arg(long, default_value = "albums")]
    table: String,

    /// Write into this SQLite file instead of MySQL
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Also dump the scraped albums as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Rendering engine; `http` only suits mirrored or static pages
    #[arg(long, value_enum, default_value_t = DEFAULT_ENGINE)]
    engine: Engine,

    /// Show the browser window (chrome engine)
    #[arg(long)]
    headed: bool,

    #[arg(long, default_value = metallum::BASE_URL)]
    base_url: String,

    #[arg(long, default_value_t = 2000)]
    page_delay_ms: u64,

    #[arg(long, default_value_t = 400)]
    render_delay_ms: u64,

    /// Loads of a band page before giving up on an empty discography
    #[arg(long, default_value_t = 10)]
    retry_attempts: u32,

    /// First wait after an empty discography, doubled on every retry
    #[arg(long, default_value_t = 5000)]
    retry_delay_ms: u64,

    #[arg(long, default_value_t = 1000)]
    max_pages: usize,

    #[arg(long, default_value = "process_times.log")]
    log_file: PathBuf,

    /// Log to the terminal only
    #[arg(long)]
    no_log_file: bool,
}

impl Args {
    fn policy(&self) -> CrawlPolicy {
        CrawlPolicy {
            page_delay: Duration::from_millis(self.page_delay_ms),
            render_delay: Duration::from_millis(self.render_delay_ms),
            max_pages: self.max_pages,
            empty_discography: RetryPolicy {
                max_attempts: self.retry_attempts,
                initial_delay: Duration::from_millis(self.retry_delay_ms),
                ..RetryPolicy::default()
            },
        }
    }
}

fn init_tracing(args: &Args) -> Result<(), std::io::Error> {
    let file_layer = if args.no_log_file {
        None
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn,chromiumoxide=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

async fn open_browser(args: &Args) -> Result<Box<dyn Browser>, CrawlerError> {
    info!("Using {:?} engine (headed={})", args.engine, args.headed);
    match args.engine {
        Engine::Http => Ok(Box::new(HttpBrowser::new()?)),
        #[cfg(feature = "browser")]
        Engine::Chrome => Ok(Box::new(
            metallum_crawler::browser::ChromeBrowser::launch(!args.headed).await?,
        )),
        #[cfg(not(feature = "browser"))]
        Engine::Chrome => Err(CrawlerError::Browser(
            "built without the `browser` feature".to_string(),
        )),
    }
}

async fn open_writer(args: &Args) -> Result<Box<dyn UpsertWriter>, CrawlerError> {
    match &args.sqlite {
        Some(path) => {
            let writer = SqliteWriter::open(path).await?;
            writer
                .create_table(&args.table, &albums_schema(&args.table))
                .await?;
            Ok(Box::new(writer))
        }
        None => {
            let credentials = Credentials::from_file(&args.credentials).await?;
            Ok(Box::new(MySqlWriter::connect(&credentials).await?))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args)?;

    let browser = open_browser(&args).await?;
    let mut scraper = MetallumScraper::new(browser, args.min_rating)
        .with_policy(args.policy())
        .with_base_url(&args.base_url);
    let scraped = scraper.scrape_all(&args.countries).await;
    let closed = scraper.close().await;
    let albums = scraped?;
    closed?;
    info!(
        "Scraped {} albums rated {}% or more",
        albums.len(),
        args.min_rating
    );

    if let Some(path) = &args.json {
        let json = Snapshot::new(scraper.reports(), &albums).to_json()?;
        tokio::fs::write(path, json).await?;
    }

    let writer = open_writer(&args).await?;
    let written = write_albums(writer.as_ref(), &args.table, &albums).await;
    writer.close().await;
    written?;

    Ok(())
}
