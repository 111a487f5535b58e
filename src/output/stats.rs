//! Harvest run statistics
//!
//! This module collects the counters of one harvest run and prints them
//! once the run is over.

use std::time::Duration;

/// Harvest statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Search result pages requested
    pub pages_walked: u32,

    /// Search result pages that listed nothing
    pub empty_pages: u32,

    /// Detail links collected from the result pages
    pub links_discovered: usize,

    /// Batches run by the scheduler
    pub chunks: usize,

    /// Records that made it into the output
    pub records_built: usize,

    /// Links that produced no record
    pub records_dropped: usize,

    /// Records whose VIN could not be found anywhere
    pub records_without_vin: usize,

    /// Wall-clock time of the whole run
    pub elapsed: Duration,
}

impl HarvestSummary {
    /// Share of discovered links that became records, in percent
    pub fn success_rate(&self) -> f64 {
        if self.links_discovered == 0 {
            return 0.0;
        }
        (self.records_built as f64 / self.links_discovered as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_summary(summary: &HarvestSummary) {
    println!("=== Harvest Statistics ===\n");

    println!("Discovery:");
    println!("  Result pages walked: {}", summary.pages_walked);
    if summary.empty_pages > 0 {
        println!("  Empty result pages: {}", summary.empty_pages);
    }
    println!("  Listing links found: {}", summary.links_discovered);
    println!();

    println!("Records:");
    println!("  Batches: {}", summary.chunks);
    println!("  Built: {}", summary.records_built);
    println!("  Dropped: {}", summary.records_dropped);
    println!("  Without VIN: {}", summary.records_without_vin);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} listings) in {:.1}s",
        summary.success_rate(),
        summary.records_built,
        summary.links_discovered,
        summary.elapsed.as_secs_f64()
    );
}
