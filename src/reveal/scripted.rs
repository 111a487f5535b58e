//! In-memory sessions that replay a fixed page script
//!
//! `ScriptedLauncher` stands in for a real browser: each URL maps to a
//! `PageScript` describing what the page shows before and after the reveal
//! control is activated. The launcher counts opened and closed sessions so
//! callers can check that nothing leaks.

use super::session::{RevealSession, SessionLauncher, SessionOptions};
use crate::InteractionError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What one page does during a reveal
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// Navigation attempts that fail before one succeeds
    pub failing_navigations: usize,
    /// Navigation never finishes within the timeout
    pub hangs: bool,
    pub has_consent_overlay: bool,
    /// Value rendered without any interaction
    pub visible_value: Option<String>,
    /// Whether the page has a reveal control
    pub has_control: bool,
    /// Value rendered after activation; `None` means it never appears
    pub revealed_value: Option<String>,
}

impl PageScript {
    /// A page whose value appears after clicking the reveal control
    pub fn revealing(value: impl Into<String>) -> Self {
        Self {
            has_control: true,
            revealed_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// A page that renders the value without interaction
    pub fn visible(value: impl Into<String>) -> Self {
        Self {
            visible_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// A page without any reveal control
    pub fn without_control() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    navigations: Mutex<HashMap<String, usize>>,
    user_agents: Mutex<Vec<String>>,
}

/// Launcher replaying `PageScript`s keyed by URL
#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    pages: Arc<HashMap<String, PageScript>>,
    counters: Arc<Counters>,
}

impl ScriptedLauncher {
    pub fn new(pages: HashMap<String, PageScript>) -> Self {
        Self {
            pages: Arc::new(pages),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Navigations attempted for `url` across all sessions
    pub fn navigations(&self, url: &str) -> usize {
        self.counters
            .navigations
            .lock()
            .map(|n| n.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// User agents of every session opened so far
    pub fn user_agents(&self) -> Vec<String> {
        self.counters
            .user_agents
            .lock()
            .map(|agents| agents.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    type Session = ScriptedSession;

    async fn open(&self, options: SessionOptions) -> Result<ScriptedSession, InteractionError> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut agents) = self.counters.user_agents.lock() {
            agents.push(options.user_agent);
        }

        Ok(ScriptedSession {
            pages: self.pages.clone(),
            counters: self.counters.clone(),
            page: None,
            activated: false,
        })
    }
}

/// Session of a `ScriptedLauncher`
#[derive(Debug)]
pub struct ScriptedSession {
    pages: Arc<HashMap<String, PageScript>>,
    counters: Arc<Counters>,
    page: Option<PageScript>,
    activated: bool,
}

/// Element handle of a `ScriptedSession`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedControl;

impl ScriptedSession {
    fn page(&self) -> Result<&PageScript, InteractionError> {
        self.page
            .as_ref()
            .ok_or_else(|| InteractionError::Session("no page loaded".to_string()))
    }
}

#[async_trait]
impl RevealSession for ScriptedSession {
    type Element = ScriptedControl;

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), InteractionError> {
        let attempt = {
            let mut navigations = self
                .counters
                .navigations
                .lock()
                .map_err(|_| InteractionError::Session("counter poisoned".to_string()))?;
            let count = navigations.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let script = self.pages.get(url).cloned().ok_or_else(|| InteractionError::Navigation {
            url: url.to_string(),
            message: "404 Not Found".to_string(),
        })?;

        if script.hangs {
            return Err(InteractionError::Timeout {
                what: format!("loading {}", url),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        if attempt <= script.failing_navigations {
            return Err(InteractionError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }

        self.page = Some(script);
        Ok(())
    }

    async fn click_if_present(&mut self, _selector: &str) -> Result<bool, InteractionError> {
        Ok(self.page()?.has_consent_overlay)
    }

    async fn text_of(&mut self, _selector: &str) -> Result<Option<String>, InteractionError> {
        let page = self.page()?;
        if self.activated {
            Ok(page.revealed_value.clone())
        } else {
            Ok(page.visible_value.clone())
        }
    }

    async fn find_by_text(
        &mut self,
        _selector: &str,
        _label: &str,
    ) -> Result<Option<ScriptedControl>, InteractionError> {
        Ok(self.page()?.has_control.then_some(ScriptedControl))
    }

    async fn activate(&mut self, _element: &ScriptedControl) -> Result<(), InteractionError> {
        self.page()?;
        self.activated = true;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<bool, InteractionError> {
        Ok(self.activated && self.page()?.revealed_value.is_some())
    }

    async fn close(self) -> Result<(), InteractionError> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
