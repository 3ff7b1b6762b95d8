//! `recsite consume` command implementation.

use std::time::Duration;

use clap::Args;
use recsite_pipeline::{Consumer, CycleReport};

use super::services::Services;
use crate::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the consume command.
#[derive(Args)]
pub(crate) struct ConsumeArgs {
    /// Run a single cycle and exit.
    #[arg(long, conflicts_with = "max_cycles")]
    once: bool,

    /// Stop after this many cycles (default: run until interrupted).
    #[arg(long)]
    max_cycles: Option<usize>,
}

impl ConsumeArgs {
    /// Execute the consume command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or a collaborator cannot be built.
    pub(crate) fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let services = Services::connect(global)?;

        let (queue_config, queue) = services.queue()?;
        let consumer = Consumer::new(queue, services.cascade()?, services.batcher()?)
            .with_visibility_timeout(Duration::from_secs(u64::from(
                queue_config.visibility_timeout,
            )));

        if self.once {
            let report = consumer.run_cycle();
            print_cycle(&output, &report);
            return Ok(());
        }

        let idle_delay = Duration::from_millis(queue_config.idle_delay_ms);
        output.info("Consuming change notifications");
        let totals = consumer.run(idle_delay, self.max_cycles);
        output.success(&format!(
            "Ran {} cycles: {} processed, {} failed",
            totals.cycles, totals.processed, totals.failed
        ));
        Ok(())
    }
}

fn print_cycle(output: &Output, report: &CycleReport) {
    if report.is_idle() {
        output.info("No notifications waiting");
        return;
    }
    output.info(&format!(
        "Cycle {}: {} received, {} processed, {} deleted",
        report.cycle_id, report.received, report.processed, report.deleted
    ));
    for inconsistency in &report.inconsistencies {
        output.warning(&format!("  {inconsistency}"));
    }
    if report.redelivered > 0 {
        output.warning("Visibility timeout lapsed during the drain, consider raising it");
    }
    if report.failed > 0 {
        output.warning(&format!(
            "{} notifications failed and stay queued for redelivery",
            report.failed
        ));
    }
    match &report.invalidation {
        Some(outcome) => match &outcome.invalidation_id {
            Some(id) => output.success(&format!(
                "Invalidated {} paths ({id})",
                outcome.request.paths.len()
            )),
            None => output.warning("Cache invalidation failed"),
        },
        None => output.info("No pages changed"),
    }
}
