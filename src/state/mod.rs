//! State module for tracking interactive reveal progress
//!
//! # Components
//!
//! - `RevealState`: Where a single reveal attempt stands (navigated, revealed, closed, etc.)
//! - `RevealFlow`: Enforces legal transitions and records the path taken

mod reveal_state;

// Re-export main types
pub use reveal_state::{RevealFlow, RevealState};
