//! One lazily launched headless browser shared by every image fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::types::BrowserConfig;
use crate::error::{CatalogError, Result};
use crate::ports::image_fetcher::FetchedImage;

/// A liveness check slower than this counts as a dead browser.
const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// A running browser process. Calls block and must run off the async runtime.
pub trait BrowserSession: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Open a tab, load `url` as a top-level navigation and return the body.
    /// The tab is closed before returning on every path.
    fn fetch_image(
        &self,
        url: &str,
        referer: &str,
        navigation_timeout: Duration,
    ) -> Result<Option<FetchedImage>>;
}

/// Starts browser processes. Blocking.
pub trait BrowserLauncher: Send + Sync {
    fn launch(&self) -> Result<Arc<dyn BrowserSession>>;
}

pub struct SharedBrowser {
    launcher: Arc<dyn BrowserLauncher>,
    launch_timeout: Duration,
    navigation_timeout: Duration,
    liveness_timeout: Duration,
    referer: String,
    session: Mutex<Option<Arc<dyn BrowserSession>>>,
}

impl SharedBrowser {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: &BrowserConfig) -> Self {
        Self {
            launcher,
            launch_timeout: Duration::from_secs(config.launch_timeout_secs),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            liveness_timeout: LIVENESS_TIMEOUT,
            referer: config.referer.clone(),
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Runs the blocking liveness check on the blocking pool. A check that
    /// panics or outlives `liveness_timeout` reports the session as dead.
    async fn is_alive(&self, session: &Arc<dyn BrowserSession>) -> bool {
        let session = Arc::clone(session);
        let check = tokio::task::spawn_blocking(move || session.is_connected());
        matches!(
            tokio::time::timeout(self.liveness_timeout, check).await,
            Ok(Ok(true))
        )
    }

    /// The live session, launching one if needed.
    ///
    /// The lock is held across the launch, so concurrent callers wait for
    /// and then share a single browser.
    pub async fn session(&self) -> Result<Arc<dyn BrowserSession>> {
        let mut slot = self.session.lock().await;
        if let Some(session) = slot.as_ref() {
            if self.is_alive(session).await {
                return Ok(Arc::clone(session));
            }
            warn!("Headless browser disconnected, relaunching");
            *slot = None;
        }

        let launcher = Arc::clone(&self.launcher);
        let launch = tokio::task::spawn_blocking(move || launcher.launch());
        let session = match tokio::time::timeout(self.launch_timeout, launch).await {
            Err(_) => {
                warn!(
                    timeout_secs = self.launch_timeout.as_secs(),
                    "Headless browser launch timed out"
                );
                return Err(CatalogError::BrowserLaunchTimeout {
                    timeout_secs: self.launch_timeout.as_secs(),
                });
            }
            Ok(Err(join)) => {
                return Err(CatalogError::Browser {
                    reason: format!("launch task failed: {join}"),
                });
            }
            Ok(Ok(launched)) => launched?,
        };

        info!("Headless browser launched");
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Fetch an image through the browser.
    ///
    /// Launch failures are errors; a page that fails to load is `Ok(None)`.
    pub async fn fetch_image(&self, url: &str) -> Result<Option<FetchedImage>> {
        let session = self.session().await?;
        let url = url.to_string();
        let referer = self.referer.clone();
        let navigation_timeout = self.navigation_timeout;
        let probe: Arc<dyn BrowserSession> = Arc::clone(&session);

        let fetched = tokio::task::spawn_blocking(move || {
            session.fetch_image(&url, &referer, navigation_timeout)
        })
        .await;

        match fetched {
            Ok(Ok(image)) => Ok(image),
            Ok(Err(e)) => {
                warn!(error = %e, "Browser image fetch failed");
                if !self.is_alive(&probe).await {
                    self.reset().await;
                }
                Ok(None)
            }
            Err(join) => {
                warn!(error = %join, "Browser image fetch task failed");
                self.reset().await;
                Ok(None)
            }
        }
    }

    /// Drop the current session; the next fetch launches a new one.
    pub async fn reset(&self) {
        *self.session.lock().await = None;
    }
}
