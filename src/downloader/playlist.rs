// PlaylistExpander - turns a playlist URL into one job per entry
//
// Metadata is fetched once (with the usual block retry). Every entry lands
// in `<root>/<playlist folder name>/` and carries its position, which later
// becomes the "NN. " filename prefix.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::config::BlockRetryConfig;
use super::errors::JobError;
use super::models::{DownloadJob, MediaItem};
use super::retry::retry_on_block;
use super::traits::{PathSanitizer, RemoteCatalogProvider};

pub struct PlaylistExpander {
    catalog: Arc<dyn RemoteCatalogProvider>,
    sanitizer: Arc<dyn PathSanitizer>,
    root_dir: PathBuf,
    retry: BlockRetryConfig,
    cancel: CancellationToken,
}

impl PlaylistExpander {
    pub fn new(
        catalog: Arc<dyn RemoteCatalogProvider>,
        sanitizer: Arc<dyn PathSanitizer>,
        root_dir: impl Into<PathBuf>,
        retry: BlockRetryConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            sanitizer,
            root_dir: root_dir.into(),
            retry,
            cancel,
        }
    }

    pub async fn expand(&self, playlist_url: &str) -> Result<Vec<DownloadJob>, JobError> {
        let catalog = &self.catalog;
        let playlist = retry_on_block(&self.retry, &self.cancel, "playlist metadata", move || {
            catalog.fetch_playlist_meta(playlist_url)
        })
        .await?;

        let output_dir = self.root_dir.join(self.sanitizer.to_folder_name(&playlist.title));
        tokio::fs::create_dir_all(&output_dir).await?;

        tracing::info!(
            playlist = %playlist.title,
            output_dir = %output_dir.display(),
            items = playlist.entries.len(),
            "Expanded playlist"
        );

        let jobs = playlist
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let item = MediaItem {
                    url: entry.url,
                    playlist_index: Some(index),
                    title: entry.title,
                };
                DownloadJob::new(item, output_dir.clone())
            })
            .collect();

        Ok(jobs)
    }
}
