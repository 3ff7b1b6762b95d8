//! `recsite path` command implementation.

use clap::Args;
use recsite_paths::{derive, parse_timestamp};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the path command.
#[derive(Args)]
pub(crate) struct PathArgs {
    /// Organization name.
    organization: String,

    /// Meeting topic.
    #[arg(long)]
    topic: Option<String>,

    /// Meeting start time (ISO-8601, e.g. 2024-01-01T15:02:31Z).
    #[arg(long, requires = "topic")]
    start: Option<String>,
}

impl PathArgs {
    /// Execute the path command.
    ///
    /// # Errors
    ///
    /// Returns an error if `--start` is not a valid timestamp.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let start = self.start.as_deref().map(parse_timestamp).transpose()?;
        let path = derive(&self.organization, self.topic.as_deref(), start);
        Output::new().result(&path);
        Ok(())
    }
}
