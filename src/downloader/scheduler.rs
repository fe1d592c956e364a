// BatchScheduler - runs the per-job pipeline over a set of jobs
//
// Each job goes listing -> selection -> fetch -> (remux). A failing job only
// fills its own slot in the result sequence; the batch always runs to the
// end. Parallel mode uses a bounded pool and puts results back into
// submission order before returning them.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::config::BlockRetryConfig;
use super::errors::JobError;
use super::fetch::FetchOrchestrator;
use super::format_selector::StreamSelector;
use super::models::{CompletedDownload, DownloadJob, DownloadResult};
use super::remux::Remuxer;
use super::retry::retry_on_block;
use super::traits::{PathSanitizer, RemoteCatalogProvider};

/// How a batch is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Strictly one job after another
    Sequential,
    /// Up to `pool_size` jobs at a time
    Parallel { pool_size: usize },
}

/// Everything one job needs, shared by all workers of a batch
pub struct JobPipeline {
    catalog: Arc<dyn RemoteCatalogProvider>,
    selector: StreamSelector,
    fetcher: FetchOrchestrator,
    remuxer: Remuxer,
    sanitizer: Arc<dyn PathSanitizer>,
    retry: BlockRetryConfig,
    cancel: CancellationToken,
}

impl JobPipeline {
    pub fn new(
        catalog: Arc<dyn RemoteCatalogProvider>,
        selector: StreamSelector,
        fetcher: FetchOrchestrator,
        remuxer: Remuxer,
        sanitizer: Arc<dyn PathSanitizer>,
        retry: BlockRetryConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            catalog,
            selector,
            fetcher,
            remuxer,
            sanitizer,
            retry,
            cancel,
        }
    }

    /// Run one job to completion. The job's staging directory is gone
    /// afterwards, whatever the outcome.
    pub async fn run(&self, job: &DownloadJob) -> Result<CompletedDownload, JobError> {
        let outcome = self.process(job).await;

        let staging = self.fetcher.staging_dir(job);
        if tokio::fs::try_exists(&staging).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
                tracing::warn!(
                    staging = %staging.display(),
                    error = %e,
                    "Failed to remove staging directory"
                );
            }
        }

        outcome
    }

    async fn process(&self, job: &DownloadJob) -> Result<CompletedDownload, JobError> {
        if self.cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let catalog = &self.catalog;
        let item = &job.item;
        let listing = retry_on_block(&self.retry, &self.cancel, "stream listing", move || {
            catalog.list_streams(item)
        })
        .await?;

        let title = if listing.title.trim().is_empty() {
            item.title.clone().unwrap_or(listing.id)
        } else {
            listing.title
        };

        let selection = self.selector.select(&listing.streams)?;

        let fetched = tokio::select! {
            fetched = self.fetcher.fetch(job, &title, &selection) => fetched?,
            _ = self.cancel.cancelled() => return Err(JobError::Cancelled),
        };

        let path = match &fetched.audio {
            None => fetched.video,
            Some(audio) => {
                let dest = job.output_dir.join(
                    self.sanitizer
                        .to_file_name(&job.output_name(&title, &selection.video.container)),
                );
                self.remuxer.remux(&fetched.video, audio, &dest).await?
            }
        };

        Ok(CompletedDownload {
            title,
            video: selection.video,
            audio: selection.audio,
            path,
        })
    }
}

pub struct BatchScheduler {
    pipeline: Arc<JobPipeline>,
}

impl BatchScheduler {
    pub fn new(pipeline: Arc<JobPipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self, jobs: Vec<DownloadJob>, mode: BatchMode) -> Vec<DownloadResult> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let total = jobs.len();
        tracing::info!(jobs = total, ?mode, "Starting batch");

        let results = match mode {
            BatchMode::Sequential => {
                let mut results = Vec::with_capacity(total);
                for (position, job) in jobs.into_iter().enumerate() {
                    results.push(Self::run_job(&self.pipeline, position, job).await);
                }
                results
            }
            BatchMode::Parallel { pool_size } => {
                let workers = pool_size.min(total).max(1);

                let mut results: Vec<DownloadResult> =
                    stream::iter(jobs.into_iter().enumerate().map(|(position, job)| {
                        let pipeline = Arc::clone(&self.pipeline);
                        let job_id = job.id;
                        let url = job.item.url.clone();

                        async move {
                            let handle = tokio::spawn(async move {
                                Self::run_job(&pipeline, position, job).await
                            });
                            match handle.await {
                                Ok(result) => result,
                                Err(e) => {
                                    tracing::error!(position, %url, error = %e, "Job task failed");
                                    DownloadResult {
                                        position,
                                        job_id,
                                        url,
                                        outcome: Err(JobError::TaskFailed(e.to_string())),
                                    }
                                }
                            }
                        }
                    }))
                    .buffer_unordered(workers)
                    .collect()
                    .await;

                results.sort_by_key(|r| r.position);
                results
            }
        };

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        tracing::info!(
            jobs = total,
            succeeded,
            failed = total - succeeded,
            "Batch finished"
        );
        results
    }

    /// Run a single job outside of any batch
    pub async fn run_one(&self, job: DownloadJob) -> DownloadResult {
        Self::run_job(&self.pipeline, 0, job).await
    }

    async fn run_job(pipeline: &JobPipeline, position: usize, job: DownloadJob) -> DownloadResult {
        let outcome = pipeline.run(&job).await;

        match &outcome {
            Ok(done) => tracing::info!(
                position,
                title = %done.title,
                path = %done.path.display(),
                remuxed = done.remuxed(),
                "Job completed"
            ),
            Err(e) => tracing::warn!(position, url = %job.item.url, error = %e, "Job failed"),
        }

        DownloadResult {
            position,
            job_id: job.id,
            url: job.item.url,
            outcome,
        }
    }
}
