//! Browser session and isolated browsing contexts over the DevTools protocol

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::Page;
use chromiumoxide::Element;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};

/// How often bounded waits re-check their condition
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One automation-engine session owning the Chromium process.
///
/// Contexts handed out by [`Session::new_context`] live until the session
/// closes; `close` shuts down every context, the browser, and the CDP
/// event loop.
pub struct Session {
    browser: Browser,
    handler_task: Option<JoinHandle<()>>,
}

impl Session {
    pub async fn launch(config: &SessionConfig) -> HarnessResult<Self> {
        let mut builder =
            BrowserConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(HarnessError::BrowserLaunch)?;

        info!(
            "Launching {} browser session",
            if config.headless { "headless" } else { "headed" }
        );
        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // The handler stream must be polled for the CDP connection to make
        // progress; it ends when the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task: Some(handler_task),
        })
    }

    /// Open an isolated browsing context (own storage, own history) with a
    /// single page inside it.
    pub async fn new_context(&self) -> HarnessResult<Context> {
        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?;
        let context_id = created.result.browser_context_id.clone();

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(HarnessError::BrowserLaunch)?;
        let page = self.browser.new_page(target).await?;

        debug!("Opened isolated browsing context");
        Ok(Context { page })
    }

    /// Close all contexts and the browser, then join the CDP event loop.
    pub async fn close(mut self) -> HarnessResult<()> {
        self.browser.close().await?;
        self.browser.wait().await?;
        if let Some(task) = self.handler_task.take() {
            let _ = task.await;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

/// Configuration for the browser session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Disable the Chromium sandbox (containers without user namespaces)
    pub no_sandbox: bool,

    /// Explicit browser binary; autodetected when unset
    pub chrome_executable: Option<PathBuf>,

    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: false,
            chrome_executable: None,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// An isolated browsing context and the single page driven inside it.
///
/// Every wait is a bounded synchronization point; a timeout is fatal to
/// the run, never retried.
pub struct Context {
    page: Page,
}

impl Context {
    /// Navigate and wait for the load to settle.
    pub async fn goto(&self, url: &str) -> HarnessResult<()> {
        debug!("Navigating to {}", url);
        self.page.goto(url).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    /// Reload so freshly written persisted state is picked up.
    pub async fn reload(&self) -> HarnessResult<()> {
        debug!("Reloading page");
        self.page.reload().await?;
        Ok(())
    }

    /// Evaluate a JS expression and deserialize its value.
    pub async fn eval<T: DeserializeOwned>(&self, expr: &str) -> HarnessResult<T> {
        let value = self.page.evaluate(expr).await?.into_value()?;
        Ok(value)
    }

    /// Run a JS expression for its side effect only.
    pub async fn run(&self, expr: &str) -> HarnessResult<()> {
        self.page.evaluate(expr).await?;
        Ok(())
    }

    /// Wait until `selector` matches an element.
    pub async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> HarnessResult<Element> {
        let start = Instant::now();
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if start.elapsed() >= timeout {
                return Err(HarnessError::WaitTimeout {
                    what: format!("element `{}`", selector),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Wait until a JS predicate evaluates to true.
    pub async fn wait_until(
        &self,
        what: &str,
        predicate: &str,
        timeout: Duration,
    ) -> HarnessResult<()> {
        let start = Instant::now();
        loop {
            if self.eval::<bool>(predicate).await.unwrap_or(false) {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(HarnessError::WaitTimeout {
                    what: what.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Click the first element matching `selector`, waiting for it first.
    /// Clicks are trusted input events, so widgets listening on pointer
    /// events (tabs, comboboxes) behave as with a real user.
    pub async fn click(&self, selector: &str, timeout: Duration) -> HarnessResult<()> {
        debug!("Clicking `{}`", selector);
        self.wait_for_element(selector, timeout).await?.click().await?;
        Ok(())
    }

    /// Click the first element matching `selector` whose text contains
    /// `text`, polling until one shows up.
    pub async fn click_by_text(
        &self,
        selector: &str,
        text: &str,
        timeout: Duration,
    ) -> HarnessResult<()> {
        debug!("Clicking `{}` labelled \"{}\"", selector, text);
        let start = Instant::now();
        loop {
            if let Ok(elements) = self.page.find_elements(selector).await {
                for element in elements {
                    let matches = element
                        .inner_text()
                        .await
                        .ok()
                        .flatten()
                        .map(|t| t.contains(text))
                        .unwrap_or(false);
                    if matches {
                        element.click().await?;
                        return Ok(());
                    }
                }
            }
            if start.elapsed() >= timeout {
                return Err(HarnessError::WaitTimeout {
                    what: format!("`{}` labelled \"{}\"", selector, text),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Read one key from the context's persisted store.
    pub async fn local_storage_get(&self, key: &str) -> HarnessResult<Option<String>> {
        #[derive(serde::Deserialize)]
        struct Slot {
            present: bool,
            value: String,
        }

        let expr = format!(
            r#"(() => {{
                const v = window.localStorage.getItem({key});
                return {{ present: v !== null, value: v === null ? '' : v }};
            }})()"#,
            key = js_string(key),
        );
        let slot: Slot = self.eval(&expr).await?;
        Ok(slot.present.then_some(slot.value))
    }

    /// Write one key into the context's persisted store, verbatim.
    pub async fn local_storage_set(&self, key: &str, value: &str) -> HarnessResult<()> {
        let expr = format!(
            "window.localStorage.setItem({}, {})",
            js_string(key),
            js_string(value),
        );
        self.run(&expr).await
    }

    /// Capture a PNG screenshot artifact at `path`, creating parent
    /// directories as needed.
    pub async fn screenshot(&self, path: &Path) -> HarnessResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let captured = self.page.execute(params).await?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&captured.data)
            .map_err(|e| HarnessError::Screenshot(e.to_string()))?;

        std::fs::write(path, bytes)?;
        info!("Screenshot saved to {}", path.display());
        Ok(())
    }
}

/// Encode a Rust string as a JS string literal. JSON escaping round-trips
/// every byte, so persisted payloads survive injection exactly.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).expect("string serialization is infallible")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_round_trips_exactly() {
        let cases = [
            r#"[{"id":"screen-1","name":"Pantalla \"Lobby\""}]"#,
            "back\\slash\nnewline\ttab",
            "tildes y eñes: configuración",
            "",
        ];
        for case in cases {
            let literal = js_string(case);
            let decoded: String = serde_json::from_str(&literal).unwrap();
            assert_eq!(decoded, case);
        }
    }

    #[test]
    fn js_string_is_a_quoted_literal() {
        let literal = js_string("plain");
        assert!(literal.starts_with('"') && literal.ends_with('"'));
    }

    #[test]
    fn session_config_defaults_headless() {
        let config = SessionConfig::default();
        assert!(config.headless);
        assert!(!config.no_sandbox);
        assert_eq!(config.viewport_width, 1280);
        assert_eq!(config.viewport_height, 720);
    }
}
