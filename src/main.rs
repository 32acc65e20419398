use anyhow::{anyhow, Context, Result};
use argh::FromArgs;
use chrono::{Local, NaiveDate};
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

mod assembler;
mod baidu_api;
mod batch;
mod commands;
mod coordinates;
mod locator;
mod manifest;
mod models;
mod pacing;
mod pano_processor;
#[cfg(test)]
mod test_support;
mod tile_fetcher;

use baidu_api::{BaiduClient, Endpoints, TransportPolicy, USER_AGENT};
use batch::DownloadOptions;
use commands::{download_history, download_snapshots};
use models::ZoomLevel;
use pacing::{DelayRange, Pacing};

static AK_ENV_VAR: &str = "BAIDU_MAP_AK";
const DATE_FORMAT: &str = "%Y%m%d";

#[derive(FromArgs)]
/// Downloads Baidu street view panoramas for every WGS84 point in a CSV file and stitches their
/// tiles into JPEGs.
struct Args {
    #[argh(positional)]
    /// CSV file with one `x,y` (longitude, latitude) point per row
    points: PathBuf,

    #[argh(option, short = 'o', default = "PathBuf::from(\"street_views\")")]
    /// directory to save panoramas to
    output: PathBuf,

    #[argh(option, short = 'k')]
    /// baidu map access key, defaults to the BAIDU_MAP_AK environment variable
    ak: Option<String>,

    #[argh(option, short = 'z', default = "ZoomLevel::Three")]
    /// tile zoom level from 1 (smallest) to 4 (largest)
    zoom: ZoomLevel,

    #[argh(option, short = 'y')]
    /// download the capture from this year where one exists instead of the current one
    year: Option<String>,

    #[argh(option, short = 'd')]
    /// date stamp (YYYYMMDD) sent with current panorama lookups, defaults to today
    date: Option<String>,

    #[argh(switch, short = 'a')]
    /// download every historical capture of every point instead of one panorama per point
    all_history: bool,

    #[argh(option, default = "10")]
    /// request timeout in seconds
    timeout: u64,

    #[argh(option, default = "String::from(USER_AGENT)")]
    /// user-agent header sent with every request
    user_agent: String,

    #[argh(option, default = "pacing::CONVERSION_DELAY")]
    /// pause after each coordinate conversion batch, in milliseconds (MIN-MAX)
    conversion_delay: DelayRange,

    #[argh(option, default = "pacing::PANORAMA_DELAY")]
    /// pause after each historical panorama, in milliseconds (MIN-MAX)
    panorama_delay: DelayRange,

    #[argh(option, default = "pacing::POINT_DELAY")]
    /// pause after each point, in milliseconds (MIN-MAX)
    point_delay: DelayRange,

    #[argh(option, default = "pacing::BACKOFF_DELAY")]
    /// extra pause after a failed request, in milliseconds (MIN-MAX)
    backoff_delay: DelayRange,

    #[argh(option, default = "PathBuf::from(\"logs\")")]
    /// directory for daily rolling log files
    log_dir: PathBuf,
}

fn resolve_udt(date: Option<String>) -> Result<String> {
    match date {
        Some(date) => {
            NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .with_context(|| format!("--date {:?} is not a YYYYMMDD date", date))?;
            Ok(date)
        }
        None => Ok(Local::now().format(DATE_FORMAT).to_string()),
    }
}

#[tokio::main]
pub async fn main() -> Result<()> {
    dotenv().ok();
    let args: Args = argh::from_env();

    let file_appender = tracing_appender::rolling::daily(&args.log_dir, "pano-scraper.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    let ak = match args.ak {
        Some(ak) => ak,
        None => env::var(AK_ENV_VAR)
            .map_err(|_| anyhow!("No access key, pass --ak or set {}", AK_ENV_VAR))?,
    };
    let udt = resolve_udt(args.date)?;
    let policy = TransportPolicy {
        timeout: Duration::from_secs(args.timeout),
        user_agent: args.user_agent,
        ..TransportPolicy::default()
    };
    let client = BaiduClient::new(&ak, &policy, Endpoints::default())?;
    let pacing = Pacing {
        after_conversion: args.conversion_delay,
        after_panorama: args.panorama_delay,
        after_point: args.point_delay,
        backoff: args.backoff_delay,
    };
    let options = DownloadOptions {
        points_path: args.points,
        output_dir: args.output,
        zoom: args.zoom,
        year: args.year,
        udt,
    };
    info!(?options, ?pacing, all_history = args.all_history, "starting download");

    let summary = if args.all_history {
        download_history(&client, &pacing, &options).await
    } else {
        download_snapshots(&client, &pacing, &options).await
    };
    match summary {
        Ok(summary) => {
            info!(
                points = summary.points,
                saved = summary.saved,
                skipped = summary.skipped,
                failed = summary.failed,
                "done"
            );
            Ok(())
        }
        Err(err) => {
            error!(error = ?err, "download run aborted");
            Err(err)
        }
    }
}
