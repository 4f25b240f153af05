//! Reporting pipeline for a BookStack wiki instance: fetch every collection
//! through the paginated JSON API, cross-reference entities into an in-memory
//! index, and project the enriched records into a multi-sheet xlsx workbook.

pub mod client;
pub mod config;
pub mod enrich;
pub mod fetch;
pub mod index;
pub mod model;
pub mod progress;
pub mod report;
pub mod table;
pub mod workbook;

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use client::{ApiTransport, HttpClient};
pub use config::{Config, ResolvedConfig, Site, load_config};
pub use index::{RefIndex, build_index};
pub use progress::{Phase, Progress};
pub use report::{ReportSet, Reporter};
pub use table::{ColumnSpec, Table};

/// Build the reference index and run all nine reports against a live
/// instance, writing the workbook to `destination`. The progress handle is
/// cleared at run start; a poller holding a clone sees the phase readout
/// advance while the run executes.
pub fn run_reports(
    config: &ResolvedConfig,
    destination: &Path,
    progress: &Progress,
) -> Result<PathBuf> {
    let client = HttpClient::new(config)?;
    progress.clear();
    let index = build_index(&client, progress)?;
    Reporter::new(&client, &index, &config.site, progress)
        .refetch_membership(config.refetch_membership)
        .run_reports(destination)
}
