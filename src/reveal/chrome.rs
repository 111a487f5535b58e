//! Chrome-backed sessions over the DevTools protocol
//!
//! Each session launches its own browser process with a throwaway profile
//! directory, so no cookies or storage leak between attempts.

use super::session::{RevealSession, SessionLauncher, SessionOptions};
use crate::config::BrowserConfig;
use crate::InteractionError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig as ChromeConfig, Element, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Common Chrome executable paths to check
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

/// Executable names looked up on `PATH` when no known location exists
const CHROME_COMMANDS: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const NOT_FOUND_HINT: &str =
    "Chrome/Chromium not found; install it, set [browser] chrome-path, or run with --no-browser";

/// How often `wait_for_selector` re-queries the page
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Element-level activation, immune to overlays covering the control
const ACTIVATE_SCRIPT: &str = "function() { this.click(); }";

/// Upper bound for each teardown step before the process is killed
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens one Chrome process per session
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    executable: PathBuf,
}

impl ChromeLauncher {
    /// Locates the browser executable
    ///
    /// # Returns
    ///
    /// * `Err(InteractionError::Launch)` - No usable Chrome/Chromium was found
    pub fn new(config: &BrowserConfig) -> Result<Self, InteractionError> {
        let executable = match &config.chrome_path {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(InteractionError::Launch(format!(
                        "configured chrome-path {} does not exist",
                        path.display()
                    )));
                }
                path
            }
            None => find_chrome()?,
        };

        tracing::info!("Using browser at {}", executable.display());
        Ok(Self { executable })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

fn find_chrome() -> Result<PathBuf, InteractionError> {
    for path in CHROME_PATHS {
        let p = Path::new(path);
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(InteractionError::Launch(NOT_FOUND_HINT.to_string()))
}

fn session_error(e: impl std::fmt::Display) -> InteractionError {
    InteractionError::Session(e.to_string())
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn open(&self, options: SessionOptions) -> Result<ChromeSession, InteractionError> {
        let profile = tempfile::Builder::new()
            .prefix("moto-harvest-")
            .tempdir()
            .map_err(|e| InteractionError::Launch(format!("profile directory: {}", e)))?;

        let mut builder = ChromeConfig::builder()
            .chrome_executable(&self.executable)
            .user_data_dir(profile.path())
            .window_size(options.viewport_width, options.viewport_height)
            .viewport(Viewport {
                width: options.viewport_width,
                height: options.viewport_height,
                ..Default::default()
            })
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu");

        // with_head means NOT headless
        if !options.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(InteractionError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| InteractionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match prepare_page(&browser, &options.user_agent).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = shut_down(&mut browser, SHUTDOWN_TIMEOUT).await {
                    tracing::debug!("Teardown after failed open: {}", close_err);
                }
                handler.abort();
                return Err(e);
            }
        };

        Ok(ChromeSession {
            browser,
            page,
            handler,
            _profile: profile,
        })
    }
}

async fn prepare_page(browser: &Browser, user_agent: &str) -> Result<Page, InteractionError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(session_error)?;
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await
        .map_err(session_error)?;
    Ok(page)
}

/// Process-level teardown steps of a launched browser
#[async_trait]
trait BrowserProcess: Send {
    /// Asks the browser to exit over the protocol
    async fn request_close(&mut self) -> Result<(), String>;

    async fn force_kill(&mut self);

    async fn wait_exit(&mut self) -> Result<(), String>;
}

#[async_trait]
impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> Result<(), String> {
        self.close().await.map(|_| ()).map_err(|e| e.to_string())
    }

    async fn force_kill(&mut self) {
        if let Some(Err(e)) = self.kill().await {
            tracing::debug!("Failed to kill browser process: {}", e);
        }
    }

    async fn wait_exit(&mut self) -> Result<(), String> {
        self.wait().await.map(|_| ()).map_err(|e| e.to_string())
    }
}

/// Closes the browser, killing it when it does not go away on its own
///
/// Every step is bounded by `limit`, so a dead protocol connection can
/// never stall the caller.
async fn shut_down<P: BrowserProcess>(
    process: &mut P,
    limit: Duration,
) -> Result<(), InteractionError> {
    let closed = match tokio::time::timeout(limit, process.request_close()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(session_error(e)),
        Err(_) => Err(InteractionError::Timeout {
            what: "closing the browser".to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    };

    if closed.is_err() {
        process.force_kill().await;
    }

    match tokio::time::timeout(limit, process.wait_exit()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("Browser process did not exit cleanly: {}", e),
        Err(_) => {
            tracing::warn!(
                "Browser process still running after {:?}, killing it",
                limit
            );
            process.force_kill().await;
        }
    }

    closed
}

/// One Chrome process with a single tab
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    // Dropped after the browser is gone
    _profile: TempDir,
}

impl ChromeSession {
    async fn query(&self, selector: &str) -> Result<Vec<Element>, InteractionError> {
        self.page
            .find_elements(selector)
            .await
            .map_err(session_error)
    }
}

#[async_trait]
impl RevealSession for ChromeSession {
    type Element = Element;

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), InteractionError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(InteractionError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(InteractionError::Timeout {
                what: format!("loading {}", url),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn click_if_present(&mut self, selector: &str) -> Result<bool, InteractionError> {
        let elements = self.query(selector).await?;
        match elements.first() {
            Some(element) => {
                element
                    .call_js_fn(ACTIVATE_SCRIPT, false)
                    .await
                    .map_err(session_error)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn text_of(&mut self, selector: &str) -> Result<Option<String>, InteractionError> {
        let elements = self.query(selector).await?;
        match elements.first() {
            Some(element) => element.inner_text().await.map_err(session_error),
            None => Ok(None),
        }
    }

    async fn find_by_text(
        &mut self,
        selector: &str,
        label: &str,
    ) -> Result<Option<Element>, InteractionError> {
        for element in self.query(selector).await? {
            let text = element.inner_text().await.map_err(session_error)?;
            if text.is_some_and(|t| t.contains(label)) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn activate(&mut self, element: &Element) -> Result<(), InteractionError> {
        element
            .call_js_fn(ACTIVATE_SCRIPT, false)
            .await
            .map_err(session_error)?;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, InteractionError> {
        let poll = async {
            loop {
                if let Ok(found) = self.page.find_elements(selector).await {
                    if !found.is_empty() {
                        return;
                    }
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        Ok(tokio::time::timeout(timeout, poll).await.is_ok())
    }

    async fn close(mut self) -> Result<(), InteractionError> {
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Failed to close page: {}", e),
            Err(_) => tracing::debug!("Closing the page timed out"),
        }
        let closed = shut_down(&mut self.browser, SHUTDOWN_TIMEOUT).await;
        self.handler.abort();
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configured_path_is_rejected() {
        let config = BrowserConfig {
            chrome_path: Some("/definitely/not/a/browser".to_string()),
            ..Default::default()
        };

        let err = ChromeLauncher::new(&config).unwrap_err();
        assert!(matches!(err, InteractionError::Launch(_)));
    }

    #[test]
    fn test_configured_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("chrome");
        std::fs::write(&fake, "").unwrap();

        let config = BrowserConfig {
            chrome_path: Some(fake.to_string_lossy().to_string()),
            ..Default::default()
        };

        let launcher = ChromeLauncher::new(&config).unwrap();
        assert_eq!(launcher.executable(), fake.as_path());
    }

    /// Browser process double; `wait_exit` only returns once the process is gone
    #[derive(Default)]
    struct FakeProcess {
        close_fails: bool,
        close_hangs: bool,
        exits_on_close: bool,
        kills: u32,
    }

    #[async_trait]
    impl BrowserProcess for FakeProcess {
        async fn request_close(&mut self) -> Result<(), String> {
            if self.close_hangs {
                std::future::pending::<()>().await;
            }
            if self.close_fails {
                return Err("connection closed".to_string());
            }
            Ok(())
        }

        async fn force_kill(&mut self) {
            self.kills += 1;
        }

        async fn wait_exit(&mut self) -> Result<(), String> {
            if self.kills == 0 && !(self.exits_on_close && !self.close_fails) {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    const LIMIT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_clean_shutdown_does_not_kill() {
        let mut process = FakeProcess {
            exits_on_close: true,
            ..Default::default()
        };

        assert!(shut_down(&mut process, LIMIT).await.is_ok());
        assert_eq!(process.kills, 0);
    }

    #[tokio::test]
    async fn test_failed_close_kills_instead_of_hanging() {
        let mut process = FakeProcess {
            close_fails: true,
            ..Default::default()
        };

        let result = tokio::time::timeout(Duration::from_secs(2), shut_down(&mut process, LIMIT))
            .await
            .expect("teardown must not hang");
        assert!(matches!(result, Err(InteractionError::Session(_))));
        assert_eq!(process.kills, 1);
    }

    #[tokio::test]
    async fn test_stuck_close_times_out_and_kills() {
        let mut process = FakeProcess {
            close_hangs: true,
            ..Default::default()
        };

        let result = tokio::time::timeout(Duration::from_secs(2), shut_down(&mut process, LIMIT))
            .await
            .expect("teardown must not hang");
        assert!(matches!(result, Err(InteractionError::Timeout { .. })));
        assert_eq!(process.kills, 1);
    }

    #[tokio::test]
    async fn test_process_that_never_exits_is_killed() {
        // Close is acknowledged but the process lingers
        let mut process = FakeProcess::default();

        let result = tokio::time::timeout(Duration::from_secs(2), shut_down(&mut process, LIMIT))
            .await
            .expect("teardown must not hang");
        assert!(result.is_ok());
        assert_eq!(process.kills, 1);
    }
}
