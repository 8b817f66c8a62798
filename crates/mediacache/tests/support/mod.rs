#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use mediacache_engine::{CacheFile, CacheFileFactory};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Axum fixture bound to an ephemeral local port.
pub struct TestServer {
    base_url: String,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Cache-file stand-in that records whether it was closed.
#[derive(Debug)]
pub struct FakeCacheFile {
    path: PathBuf,
    closed: AtomicBool,
    fail_close: bool,
}

impl FakeCacheFile {
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl CacheFile for FakeCacheFile {
    fn append(&self, _data: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn is_completed(&self) -> bool {
        false
    }

    fn available(&self) -> io::Result<u64> {
        Ok(0)
    }

    fn file(&self) -> PathBuf {
        self.path.clone()
    }

    fn close(&self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(io::Error::other("close refused"));
        }
        Ok(())
    }
}

/// Factory counting every construction; optionally refuses to construct, or
/// hands out handles whose `close` fails.
pub struct CountingFactory {
    created: std::sync::Mutex<Vec<Arc<FakeCacheFile>>>,
    fail: bool,
    fail_close: bool,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self {
            created: std::sync::Mutex::new(Vec::new()),
            fail: false,
            fail_close: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::new()
        }
    }

    pub fn constructed(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Every handle this factory has constructed, in order.
    pub fn created(&self) -> Vec<Arc<FakeCacheFile>> {
        self.created.lock().unwrap().clone()
    }
}

impl CacheFileFactory for CountingFactory {
    fn open(&self, path: &Path) -> io::Result<Arc<dyn CacheFile>> {
        if self.fail {
            return Err(io::Error::other("construction refused"));
        }
        let handle = Arc::new(FakeCacheFile {
            path: path.to_path_buf(),
            closed: AtomicBool::new(false),
            fail_close: self.fail_close,
        });
        self.created.lock().unwrap().push(handle.clone());
        Ok(handle)
    }
}
