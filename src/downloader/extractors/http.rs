// Direct HTTP stream downloader
//
// Uses the media URL and headers the catalog already resolved, so no extra
// yt-dlp process is spawned per stream. Data goes to a ".part" file that is
// renamed only once the body has been fully written.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::AsyncWriteExt;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::StreamDescriptor;
use crate::downloader::traits::StreamDownloader;

pub struct HttpStreamDownloader {
    client: reqwest::Client,
}

impl HttpStreamDownloader {
    /// Build a client, optionally routed through `proxy`
    pub fn new(proxy: Option<&str>, connect_timeout: Duration) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder().connect_timeout(connect_timeout);

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| DownloadError::InvalidUrl(format!("proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DownloadError::ExecutionError(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn headers_for(stream: &StreamDescriptor) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &stream.handle().http_headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::debug!(header = %name, "Skipping malformed provider header"),
            }
        }
        headers
    }

    async fn write_body(
        mut response: reqwest::Response,
        part_path: &Path,
    ) -> Result<u64, DownloadError> {
        let mut file = tokio::fs::File::create(part_path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

#[async_trait]
impl StreamDownloader for HttpStreamDownloader {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn download(
        &self,
        stream: &StreamDescriptor,
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<Option<PathBuf>, DownloadError> {
        let handle = stream.handle();
        let url = handle.direct_url.as_deref().ok_or_else(|| {
            DownloadError::InvalidUrl(format!("format {} has no direct URL", handle.format_id))
        })?;

        let target = dest_dir.join(file_name);
        let part_path = dest_dir.join(format!("{}.part", file_name));

        let response = self
            .client
            .get(url)
            .headers(Self::headers_for(stream))
            .send()
            .await?
            .error_for_status()?;

        match Self::write_body(response, &part_path).await {
            Ok(0) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                tracing::warn!(format_id = %handle.format_id, "Provider returned an empty body");
                Ok(None)
            }
            Ok(bytes) => {
                tokio::fs::rename(&part_path, &target).await?;
                tracing::debug!(
                    format_id = %handle.format_id,
                    bytes,
                    target = %target.display(),
                    "Stream downloaded"
                );
                Ok(Some(target))
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part_path).await;
                Err(e)
            }
        }
    }
}
