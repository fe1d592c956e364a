use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use playlist_downloader_lib::downloader::tools::ToolManager;
use playlist_downloader_lib::{ConfigError, Downloader, DownloaderConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; defaults apply when omitted
    #[arg(short, long, env = "PLAYLIST_DOWNLOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Print yt-dlp and ffmpeg availability
    #[arg(long)]
    tools: bool,

    /// Video or playlist URLs, processed as one batch
    #[arg(required_unless_present = "tools")]
    urls: Vec<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<DownloaderConfig, ConfigError> {
    match path {
        Some(path) => DownloaderConfig::from_file(path),
        None => Ok(DownloaderConfig::default()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playlist_downloader_lib=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.tools {
        for tool in ToolManager::new().get_all_tools() {
            match (&tool.path, &tool.version) {
                (Some(path), version) => println!(
                    "{}: {} ({})",
                    tool.name,
                    version.as_deref().unwrap_or("unknown version"),
                    path.display()
                ),
                (None, _) => println!("{}: not found", tool.name),
            }
        }
        if args.urls.is_empty() {
            return ExitCode::SUCCESS;
        }
    }

    let downloader = match load_config(args.config.as_ref()).and_then(Downloader::from_system) {
        Ok(downloader) => downloader,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let cancel = downloader.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining jobs");
            cancel.cancel();
        }
    });

    let report = downloader.download_urls(&args.urls).await;

    for line in report.summary_lines() {
        println!("{}", line);
    }
    for url in &report.rejected {
        println!("skipped: {}", url);
    }
    for (url, error) in &report.failed_playlists {
        println!("playlist failed: {} ({})", url, error);
    }

    if report.succeeded() == report.results.len() && report.failed_playlists.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
