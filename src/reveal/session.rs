//! Browser session contract used by the reveal extractor

use crate::InteractionError;
use async_trait::async_trait;
use std::time::Duration;

/// Settings for one isolated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,
}

/// Opens fresh, isolated browsing sessions
///
/// Every call must return a session that shares no storage with any other.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: RevealSession;

    async fn open(&self, options: SessionOptions) -> Result<Self::Session, InteractionError>;
}

/// The handful of page interactions the VIN reveal needs
#[async_trait]
pub trait RevealSession: Send {
    /// Handle to an element found on the page
    type Element: Send + Sync;

    /// Loads `url`; exceeding `timeout` is an error
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), InteractionError>;

    /// Clicks the first match of `selector`; `Ok(false)` when nothing matches
    async fn click_if_present(&mut self, selector: &str) -> Result<bool, InteractionError>;

    /// Text of the first match of `selector`, if any
    async fn text_of(&mut self, selector: &str) -> Result<Option<String>, InteractionError>;

    /// First match of `selector` whose visible text contains `label`
    async fn find_by_text(
        &mut self,
        selector: &str,
        label: &str,
    ) -> Result<Option<Self::Element>, InteractionError>;

    /// Fires the element's own click handler rather than a pointer event
    async fn activate(&mut self, element: &Self::Element) -> Result<(), InteractionError>;

    /// Waits until `selector` matches; `Ok(false)` on timeout
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, InteractionError>;

    /// Releases the session and everything it owns
    async fn close(self) -> Result<(), InteractionError>;
}

/// Launcher for builds or runs without a browser
///
/// Every `open` fails with `InteractionError::Unavailable`, which the
/// extractor treats as final, so records fall back to static sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLauncher;

/// Session type of `DisabledLauncher`; never constructed
#[derive(Debug)]
pub enum NoSession {}

#[async_trait]
impl SessionLauncher for DisabledLauncher {
    type Session = NoSession;

    async fn open(&self, _options: SessionOptions) -> Result<NoSession, InteractionError> {
        Err(InteractionError::Unavailable)
    }
}

#[async_trait]
impl RevealSession for NoSession {
    type Element = ();

    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<(), InteractionError> {
        match *self {}
    }

    async fn click_if_present(&mut self, _selector: &str) -> Result<bool, InteractionError> {
        match *self {}
    }

    async fn text_of(&mut self, _selector: &str) -> Result<Option<String>, InteractionError> {
        match *self {}
    }

    async fn find_by_text(
        &mut self,
        _selector: &str,
        _label: &str,
    ) -> Result<Option<()>, InteractionError> {
        match *self {}
    }

    async fn activate(&mut self, _element: &()) -> Result<(), InteractionError> {
        match *self {}
    }

    async fn wait_for_selector(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<bool, InteractionError> {
        match *self {}
    }

    async fn close(self) -> Result<(), InteractionError> {
        match self {}
    }
}
