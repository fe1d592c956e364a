// Facade tests with in-memory collaborators

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ConcatMuxer, FileDownloader, StaticCatalog};
use playlist_downloader_lib::downloader::ExecutionMode;
use playlist_downloader_lib::{Downloader, DownloaderConfig, JobError};

fn config(root: &std::path::Path, mode: ExecutionMode) -> DownloaderConfig {
    let mut config = DownloaderConfig::with_root(root);
    config.mode = mode;
    config.max_threads = 4;
    config
}

#[tokio::test]
async fn test_playlist_in_parallel_mode() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = StaticCatalog::default().with_playlist(
        "https://media.test/playlist?list=1",
        "Road Trip",
        &[("Intro", true), ("Highway", false), ("Outro", false)],
    );
    let downloader = Downloader::new(
        config(dir.path(), ExecutionMode::Parallel),
        Arc::new(catalog),
        Arc::new(FileDownloader::default()),
        Arc::new(ConcatMuxer),
    )
    .unwrap();

    let results = downloader
        .download_playlist("https://media.test/playlist?list=1")
        .await
        .unwrap();

    let folder = dir.path().join("road-trip");
    let paths: Vec<_> = results
        .iter()
        .map(|r| r.completed().unwrap().path.clone())
        .collect();
    assert_eq!(
        paths,
        vec![
            folder.join("01. Intro.mp4"),
            folder.join("02. Highway.mp4"),
            folder.join("03. Outro.mp4"),
        ]
    );

    assert_eq!(std::fs::read(&paths[0]).unwrap(), b"video");
    assert_eq!(std::fs::read(&paths[1]).unwrap(), b"videoaudio");

    let highway = results[1].completed().unwrap();
    assert_eq!(highway.video.resolution, Some(1080));
    assert_eq!(highway.audio.as_ref().unwrap().abr, "128kbps");

    // Staging is cleaned up and the empty temp root removed
    assert!(!dir.path().join("temp").exists());
}

#[tokio::test]
async fn test_unknown_playlist_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let downloader = Downloader::new(
        config(dir.path(), ExecutionMode::Sequential),
        Arc::new(StaticCatalog::default()),
        Arc::new(FileDownloader::default()),
        Arc::new(ConcatMuxer),
    )
    .unwrap();

    let err = downloader
        .download_playlist("https://media.test/playlist?list=missing")
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Catalog(_)));
}

#[tokio::test]
async fn test_mixed_batch_summary() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = StaticCatalog::default()
        .with_item("https://media.test/watch?v=1", "Single", false)
        .with_playlist(
            "https://media.test/playlist?list=2",
            "Pair",
            &[("One", true), ("Two", true)],
        );
    let downloader = Downloader::new(
        config(dir.path(), ExecutionMode::Sequential),
        Arc::new(catalog),
        Arc::new(FileDownloader::default()),
        Arc::new(ConcatMuxer),
    )
    .unwrap();

    let urls = vec![
        "https://media.test/watch?v=1".to_string(),
        "ftp://media.test/watch?v=2".to_string(),
        "https://media.test/playlist?list=2".to_string(),
        "https://media.test/watch?v=404".to_string(),
    ];
    let report = downloader.download_urls(&urls).await;

    assert_eq!(
        report.summary_lines(),
        vec![
            "01. 1080p 60fps",
            "02. 720p 30fps",
            "03. 720p 30fps",
            "04. None"
        ]
    );
    assert_eq!(report.rejected, vec!["ftp://media.test/watch?v=2".to_string()]);
    assert!(dir.path().join("Single.mp4").exists());
    assert!(dir.path().join("pair").join("02. Two.mp4").exists());
}

#[tokio::test]
async fn test_cancel_fails_unfinished_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = StaticCatalog::default().with_playlist(
        "https://media.test/playlist?list=slow",
        "Slow",
        &[("A", true), ("B", true), ("C", true)],
    );
    let stream_downloader = FileDownloader {
        delay: Some(Duration::from_millis(200)),
        ..FileDownloader::default()
    };
    let downloader = Arc::new(
        Downloader::new(
            config(dir.path(), ExecutionMode::Sequential),
            Arc::new(catalog),
            Arc::new(stream_downloader),
            Arc::new(ConcatMuxer),
        )
        .unwrap(),
    );

    let token = downloader.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let results = downloader
        .download_playlist("https://media.test/playlist?list=slow")
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results
        .iter()
        .all(|r| r.error() == Some(&JobError::Cancelled)));
}
