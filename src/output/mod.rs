//! Output module for harvested listings
//!
//! This module handles:
//! - Mapping records onto the output wire schema
//! - Writing the listings as a JSON document
//! - Recording harvest statistics

mod schema;
pub mod stats;

pub use schema::{transform, OutputListing, OutputParams, OutputPrice, CATEGORY_ID, DEFAULT_COUNTRY};
pub use stats::{print_summary, HarvestSummary};

use crate::record::ListingRecord;
use crate::HarvestError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Transforms every record, keeping their order
pub fn transform_all(records: &[ListingRecord]) -> Vec<OutputListing> {
    records.iter().map(transform).collect()
}

/// Writes listings to `path` as pretty-printed JSON
///
/// # Returns
///
/// * `Ok(())` - File written
/// * `Err(HarvestError)` - The file could not be created or serialized
pub fn write_json(listings: &[OutputListing], path: &Path) -> Result<(), HarvestError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, listings)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Wrote {} listings to {}", listings.len(), path.display());
    Ok(())
}
