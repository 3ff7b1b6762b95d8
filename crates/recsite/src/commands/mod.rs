//! CLI command implementations.

pub(crate) mod consume;
pub(crate) mod path;
pub(crate) mod rebuild;
mod services;

pub(crate) use consume::ConsumeArgs;
pub(crate) use path::PathArgs;
pub(crate) use rebuild::RebuildArgs;
