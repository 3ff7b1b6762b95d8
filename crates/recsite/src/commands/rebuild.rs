//! `recsite rebuild` command implementation.

use clap::Args;
use recsite_pipeline::{RebuildDriver, RebuildReport};

use super::services::Services;
use crate::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the rebuild command.
#[derive(Args)]
pub(crate) struct RebuildArgs {
    /// Records requested per catalog scan page (overrides config).
    #[arg(long)]
    page_size: Option<usize>,
}

impl RebuildArgs {
    /// Execute the rebuild command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the catalog scan fails.
    /// Pages discovered before a scan failure are still published.
    pub(crate) fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let services = Services::connect(global)?;

        let page_size = match self.page_size {
            Some(size) => size,
            None => services.config.require_catalog()?.scan_page_size,
        };
        let driver =
            RebuildDriver::new(services.cascade()?, services.batcher()?).with_page_size(page_size);

        output.info("Rebuilding site from catalog");
        match driver.rebuild_all() {
            Ok(report) => {
                print_report(&output, &report);
                Ok(())
            }
            Err(err) => {
                print_report(&output, &err.report);
                Err(err.into())
            }
        }
    }
}

fn print_report(output: &Output, report: &RebuildReport) {
    output.info(&format!(
        "Scanned {} records in {} pages",
        report.scanned, report.scan_pages
    ));
    for inconsistency in &report.inconsistencies {
        output.warning(&format!("  {inconsistency}"));
    }
    if report.failures > 0 {
        output.warning(&format!("{} pages failed", report.failures));
    }
    if let Some(outcome) = &report.invalidation
        && outcome.invalidation_id.is_none()
    {
        output.warning("Cache invalidation failed");
    }
    output.success(&format!(
        "Published {} meeting, {} topic and {} organization pages",
        report.meeting_pages, report.topic_pages, report.organization_pages
    ));
}
