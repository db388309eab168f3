use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::browser::shared::{BrowserLauncher, BrowserSession};
use crate::error::{CatalogError, Result};
use crate::ports::image_fetcher::FetchedImage;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

/// Re-reads the loaded document's bytes from the browser cache and hands
/// them back base64-encoded, since CDP only returns JSON values.
const READ_IMAGE_JS: &str = r"(async () => {
  const response = await fetch(location.href, { cache: 'force-cache' });
  const bytes = new Uint8Array(await response.arrayBuffer());
  let binary = '';
  for (let i = 0; i < bytes.length; i += 0x8000) {
    binary += String.fromCharCode.apply(null, bytes.subarray(i, i + 0x8000));
  }
  return JSON.stringify({
    status: response.status,
    contentType: response.headers.get('content-type') || 'image/jpeg',
    data: btoa(binary),
  });
})()";

fn browser_error(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Browser {
        reason: e.to_string(),
    }
}

/// Launches headless Chrome/Chromium via the DevTools protocol.
pub struct ChromeLauncher {
    idle_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { idle_timeout }
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Arc<dyn BrowserSession>> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .idle_browser_timeout(self.idle_timeout)
            .build()
            .map_err(browser_error)?;
        let browser = Browser::new(options).map_err(browser_error)?;
        Ok(Arc::new(ChromeSession { browser }))
    }
}

struct ChromeSession {
    browser: Browser,
}

/// Closes the tab when the fetch is done, however it ended.
struct TabGuard(Arc<Tab>);

impl Drop for TabGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close(true) {
            debug!(error = %e, "failed to close browser tab");
        }
    }
}

impl BrowserSession for ChromeSession {
    fn is_connected(&self) -> bool {
        self.browser.get_version().is_ok()
    }

    fn fetch_image(
        &self,
        url: &str,
        referer: &str,
        navigation_timeout: Duration,
    ) -> Result<Option<FetchedImage>> {
        let tab = TabGuard(self.browser.new_tab().map_err(browser_error)?);
        tab.0.set_default_timeout(navigation_timeout);
        tab.0
            .set_extra_http_headers(HashMap::from([
                ("Referer", referer),
                ("Accept", IMAGE_ACCEPT),
            ]))
            .map_err(browser_error)?;

        if let Err(e) = tab
            .0
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
        {
            warn!(url, error = %e, "browser navigation failed");
            return Ok(None);
        }

        let result = tab.0.evaluate(READ_IMAGE_JS, true).map_err(browser_error)?;
        match result.value.as_ref().and_then(serde_json::Value::as_str) {
            Some(payload) => decode_image_payload(payload),
            None => Ok(None),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagePayload {
    status: u16,
    content_type: String,
    data: String,
}

/// Decode the JSON produced by the in-page reader; non-200 responses are `None`.
fn decode_image_payload(payload: &str) -> Result<Option<FetchedImage>> {
    let payload: ImagePayload = serde_json::from_str(payload)?;
    if payload.status != 200 {
        debug!(status = payload.status, "browser fetch returned non-200");
        return Ok(None);
    }
    let bytes = STANDARD
        .decode(payload.data.as_bytes())
        .map_err(browser_error)?;
    Ok(Some(FetchedImage {
        bytes,
        content_type: payload.content_type,
    }))
}
