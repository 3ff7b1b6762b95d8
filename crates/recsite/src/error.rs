//! CLI error types.

use recsite_config::ConfigError;
use recsite_paths::TimestampError;
use recsite_pipeline::RebuildError;
use recsite_render::RenderError;
use recsite_store::StoreError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Rebuild(#[from] RebuildError),

    #[error("{0}")]
    Timestamp(#[from] TimestampError),
}
