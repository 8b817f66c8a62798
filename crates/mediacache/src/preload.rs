//! Background preloading of resource prefixes into the disk cache.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::fetch::{self, ByteRange};
use crate::proxy::ProxyUrlResolver;

type JobMap = Mutex<HashMap<String, Arc<CancellationToken>>>;

struct PreloadJob {
    id: String,
    url: String,
    preload_length: u64,
    cancel: Arc<CancellationToken>,
}

/// Schedules speculative prefix downloads on a single background worker.
///
/// Jobs run strictly in submission order, one at a time, and never raise to
/// the caller: failures are logged and resolved by dropping the job entry.
/// The job map is keyed by the cache id for scheduling, lookup and removal
/// alike, so at most one job per id is outstanding.
pub struct PreloadOrchestrator {
    jobs: Arc<JobMap>,
    queue: mpsc::UnboundedSender<PreloadJob>,
    worker: JoinHandle<()>,
}

impl PreloadOrchestrator {
    /// Create an orchestrator and spawn its worker task. The worker lives
    /// until [`shutdown`](Self::shutdown) or until the orchestrator is
    /// dropped.
    pub fn new(
        config: Arc<Config>,
        resolver: Arc<dyn ProxyUrlResolver>,
    ) -> Result<Self, EngineError> {
        let client = fetch::create_client(&config.user_agent)?;
        let jobs: Arc<JobMap> = Arc::new(Mutex::new(HashMap::new()));
        let (queue, mut rx) = mpsc::unbounded_channel::<PreloadJob>();

        let worker = {
            let jobs = jobs.clone();
            tokio::spawn(async move {
                while let Some(job) = rx.recv().await {
                    if job.cancel.is_cancelled() {
                        debug!(id = %job.id, "preload canceled before start");
                        continue;
                    }
                    match run_job(&client, &config, resolver.as_ref(), &job).await {
                        Ok(()) => debug!(id = %job.id, "preload finished"),
                        Err(err) if err.is_interrupted() => {
                            debug!(id = %job.id, "preload interrupted")
                        }
                        Err(err) => warn!(id = %job.id, error = %err, "preload failed"),
                    }
                    finish_job(&jobs, &job);
                }
            })
        };

        Ok(Self {
            jobs,
            queue,
            worker,
        })
    }

    /// Schedule a prefix download of `preload_length` bytes for `id`.
    /// No-op when a job for `id` is already tracked.
    pub fn preload(&self, id: &str, url: &str, preload_length: u64) {
        let cancel = {
            let mut jobs = self.jobs.lock();
            if jobs.contains_key(id) {
                debug!(id, "already preloading");
                return;
            }
            let cancel = Arc::new(CancellationToken::new());
            jobs.insert(id.to_string(), cancel.clone());
            cancel
        };

        debug!(id, url, preload_length, "preload scheduled");
        let job = PreloadJob {
            id: id.to_string(),
            url: url.to_string(),
            preload_length,
            cancel,
        };
        if self.queue.send(job).is_err() {
            // worker already shut down
            self.jobs.lock().remove(id);
        }
    }

    /// Whether a preload job for `id` is currently tracked.
    pub fn is_preloading(&self, id: &str) -> bool {
        self.jobs.lock().contains_key(id)
    }

    /// Cancel the tracked job for `id`, if any. The entry is removed
    /// immediately; a running download unwinds at its next read boundary.
    pub fn cancel(&self, id: &str) {
        if let Some(cancel) = self.jobs.lock().remove(id) {
            cancel.cancel();
            debug!(id, "preload canceled");
        }
    }

    /// Cancel every tracked job.
    pub fn cancel_all(&self) {
        let drained: Vec<(String, Arc<CancellationToken>)> = self.jobs.lock().drain().collect();
        for (id, cancel) in drained {
            cancel.cancel();
            debug!(id = %id, "preload canceled");
        }
    }

    /// Cancel outstanding jobs and stop the worker.
    pub async fn shutdown(self) {
        self.cancel_all();
        drop(self.queue);
        if let Err(err) = self.worker.await {
            warn!(error = %err, "preload worker terminated abnormally");
        }
    }
}

/// Drop the job entry so a later `preload` for the same id is accepted.
/// Guarded by token identity: a newer entry registered after a cancel must
/// not be clobbered by the old job finishing.
fn finish_job(jobs: &JobMap, job: &PreloadJob) {
    let mut jobs = jobs.lock();
    if jobs
        .get(&job.id)
        .is_some_and(|cancel| Arc::ptr_eq(cancel, &job.cancel))
    {
        jobs.remove(&job.id);
    }
}

async fn run_job(
    client: &Client,
    config: &Config,
    resolver: &dyn ProxyUrlResolver,
    job: &PreloadJob,
) -> Result<(), EngineError> {
    let file = config.generate_cache_file(&job.id, &job.url);
    if file.exists() || crate::cache::temp_file(&file).exists() {
        debug!(id = %job.id, file = %file.display(), "cache data already present, skipping preload");
        return Ok(());
    }

    let proxy_url = resolver.proxy_url(&job.id, &job.url);
    let request = fetch::send_request(
        client,
        &proxy_url,
        ByteRange::Prefix {
            end: job.preload_length,
        },
        None,
        config.header_injector.as_ref(),
    );
    let response = tokio::select! {
        biased;
        _ = job.cancel.cancelled() => {
            return Err(EngineError::Interrupted { url: proxy_url.clone() });
        }
        response = request => response?,
    };

    // Draining the proxy response is what lands the bytes in the disk
    // cache; the worker does not write cache bytes itself.
    let mut stream = response.bytes_stream();
    loop {
        let next = tokio::select! {
            biased;
            _ = job.cancel.cancelled() => {
                return Err(EngineError::Interrupted { url: proxy_url.clone() });
            }
            next = stream.next() => next,
        };
        match next {
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(EngineError::transport(proxy_url.as_str(), 0, err)),
            None => return Ok(()),
        }
    }
}
