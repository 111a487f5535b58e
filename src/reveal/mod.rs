//! Interactive field extraction
//!
//! Some listings only render the VIN after a client-side button press.
//! `RevealExtractor` drives one short browser session per attempt to
//! capture it:
//!
//! 1. Open an isolated session with a random user agent
//! 2. Navigate, bounded by the load timeout
//! 3. Dismiss the cookie-consent overlay if one is shown
//! 4. Return the value if it is already visible
//! 5. Otherwise activate the reveal control and wait for the value
//!
//! The session is closed after every attempt, whatever happened, and the
//! attempt's progress is tracked by a `RevealFlow`.

mod scripted;
mod session;

#[cfg(feature = "browser")]
mod chrome;

#[cfg(feature = "browser")]
pub use chrome::{ChromeLauncher, ChromeSession};
// In-memory sessions for tests and offline runs
#[doc(hidden)]
pub use scripted::{PageScript, ScriptedControl, ScriptedLauncher, ScriptedSession};
pub use session::{DisabledLauncher, NoSession, RevealSession, SessionLauncher, SessionOptions};

use crate::config::BrowserConfig;
use crate::identity::IdentityPool;
use crate::site::RevealTarget;
use crate::state::{RevealFlow, RevealState};
use crate::InteractionError;
use std::time::Duration;

/// Timing and session settings for the extractor
#[derive(Debug, Clone)]
pub struct RevealOptions {
    pub enabled: bool,
    pub headless: bool,
    pub load_timeout: Duration,
    pub reveal_timeout: Duration,
    /// Attempts after the first one
    pub retries: u32,
    pub retry_cooldown: Duration,
    pub consent_settle: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl RevealOptions {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            enabled: config.enabled,
            headless: config.headless,
            load_timeout: config.load_timeout(),
            reveal_timeout: config.reveal_timeout(),
            retries: config.retries,
            retry_cooldown: config.retry_cooldown(),
            consent_settle: config.consent_settle(),
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self::from_config(&BrowserConfig::default())
    }
}

/// What a full reveal produced
#[derive(Debug, Clone)]
pub struct RevealReport {
    pub value: Option<String>,
    pub attempts: u32,
    /// States visited by the last attempt
    pub path: Vec<RevealState>,
}

/// Captures a value hidden behind a reveal control
pub struct RevealExtractor<L> {
    launcher: L,
    target: RevealTarget,
    identities: IdentityPool,
    options: RevealOptions,
}

impl<L: SessionLauncher> RevealExtractor<L> {
    pub fn new(
        launcher: L,
        target: RevealTarget,
        identities: IdentityPool,
        options: RevealOptions,
    ) -> Self {
        Self {
            launcher,
            target,
            identities,
            options,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Reveals the value on `url`, `None` if it could not be captured
    pub async fn reveal(&self, url: &str) -> Option<String> {
        self.reveal_with_report(url).await.value
    }

    /// Like `reveal`, also reporting how many attempts it took
    ///
    /// Navigation, timeout and session errors are retried up to
    /// `retries` more times after a fixed cooldown. A page without the
    /// control, or one where the value never appears, ends the reveal
    /// straight away.
    pub async fn reveal_with_report(&self, url: &str) -> RevealReport {
        let mut report = RevealReport {
            value: None,
            attempts: 0,
            path: Vec::new(),
        };

        if !self.options.enabled {
            tracing::trace!("Interactive reveal disabled, skipping {}", url);
            return report;
        }

        let max_attempts = self.options.retries + 1;

        for attempt in 1..=max_attempts {
            report.attempts = attempt;
            let (result, flow) = self.run_attempt(url).await;
            report.path = flow.history().to_vec();

            match result {
                Ok(value) => {
                    tracing::debug!(
                        "Reveal on {} finished after {} attempt(s) (found: {})",
                        url,
                        attempt,
                        value.is_some()
                    );
                    report.value = value;
                    return report;
                }
                Err(e) if !e.is_retryable() => {
                    tracing::debug!("Reveal skipped for {}: {}", url, e);
                    return report;
                }
                Err(e) => {
                    tracing::warn!(
                        "Reveal attempt {}/{} failed for {}: {}",
                        attempt,
                        max_attempts,
                        url,
                        e
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.options.retry_cooldown).await;
                    }
                }
            }
        }

        tracing::error!(
            "Giving up on reveal for {} after {} attempts",
            url,
            max_attempts
        );
        report
    }

    /// One attempt in a fresh session; the session is closed before returning
    async fn run_attempt(
        &self,
        url: &str,
    ) -> (Result<Option<String>, InteractionError>, RevealFlow) {
        let mut flow = RevealFlow::new();

        let options = SessionOptions {
            user_agent: self.identities.choose().to_string(),
            viewport_width: self.options.viewport_width,
            viewport_height: self.options.viewport_height,
            headless: self.options.headless,
        };

        let mut session = match self.launcher.open(options).await {
            Ok(session) => session,
            Err(e) => {
                let _ = flow.advance(RevealState::Closed);
                return (Err(e), flow);
            }
        };

        let result = self.drive(&mut session, url, &mut flow).await;

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser session for {}: {}", url, e);
        }
        if let Err(e) = flow.advance(RevealState::Closed) {
            tracing::warn!("{}", e);
        }

        (result, flow)
    }

    async fn drive<S: RevealSession>(
        &self,
        session: &mut S,
        url: &str,
        flow: &mut RevealFlow,
    ) -> Result<Option<String>, InteractionError> {
        session.navigate(url, self.options.load_timeout).await?;
        flow.advance(RevealState::Navigated)?;

        // Consent overlay is optional
        let consent = &self.target.consent_selector;
        match session.click_if_present(consent).await {
            Ok(true) => {
                tracing::trace!("Dismissed consent overlay on {}", url);
                tokio::time::sleep(self.options.consent_settle).await;
            }
            Ok(false) => {}
            Err(e) => tracing::debug!("Consent overlay not dismissed on {}: {}", url, e),
        }
        flow.advance(RevealState::ConsentHandled)?;

        if let Some(value) = non_blank(session.text_of(&self.target.visible_selector).await?) {
            flow.advance(RevealState::Revealed)?;
            return Ok(Some(value));
        }

        let control = match session
            .find_by_text(&self.target.control_selector, &self.target.control_label)
            .await?
        {
            Some(control) => control,
            None => {
                tracing::debug!("No reveal control on {}", url);
                flow.advance(RevealState::Absent)?;
                return Ok(None);
            }
        };

        session.activate(&control).await?;

        if !session
            .wait_for_selector(&self.target.revealed_selector, self.options.reveal_timeout)
            .await?
        {
            tracing::debug!(
                "Value did not appear within {}ms on {}",
                self.options.reveal_timeout.as_millis(),
                url
            );
            flow.advance(RevealState::Absent)?;
            return Ok(None);
        }

        match non_blank(session.text_of(&self.target.revealed_selector).await?) {
            Some(value) => {
                flow.advance(RevealState::Revealed)?;
                Ok(Some(value))
            }
            None => {
                flow.advance(RevealState::Absent)?;
                Ok(None)
            }
        }
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
