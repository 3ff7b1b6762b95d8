//! Canonical URL paths for the recordings site.
//!
//! Every published page lives under a path derived from the meeting record:
//!
//! - `{org}` - organization page
//! - `{org}/{topic-slug}` - topic page
//! - `{org}/{topic-slug}/{rounded-start}` - meeting page
//!
//! Parent pages embed links to their children using the same derivation, so
//! these functions must stay pure: identical input always yields identical
//! output.
//!
//! # Example
//!
//! ```
//! use recsite_paths::{derive, parse_timestamp};
//!
//! let start = parse_timestamp("2024-01-01T15:02:31Z").unwrap();
//! let path = derive("Acme", Some("Weekly Sync (Acme)"), Some(start));
//! assert_eq!(path, "acme/weekly-sync/2024-01-01T10:05");
//! ```

mod path;
pub mod time;

pub use path::{derive, meeting_path, organization_path, topic_path, topic_slug};
pub use time::{TimestampError, display_time, format_timestamp, parse_timestamp, round_start};
