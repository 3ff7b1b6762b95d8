//! Meeting records and queue messages.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use recsite_paths::time::iso8601;
use serde::{Deserialize, Serialize};

/// One recorded meeting session.
///
/// Created upstream when a recording completes and never modified afterwards.
/// The pipeline only reads these records and republishes pages derived from
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingOccurrence {
    /// Unique recording identifier (table key).
    pub recording_id: String,
    /// Hosting organization (display name).
    pub organization: String,
    /// Meeting topic (display name).
    pub meeting_topic: String,
    #[serde(with = "iso8601")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub end_time: DateTime<Utc>,
    /// Canonical page path, stored at ingestion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_path: Option<String>,
    /// Recorded assets (video, audio, transcript, chat).
    #[serde(default)]
    pub files: Vec<RecordingFile>,
}

impl MeetingOccurrence {
    /// Path of this occurrence's meeting page.
    ///
    /// Uses the stored `recording_path` verbatim so links published earlier
    /// stay valid; records without one fall back to the derived path.
    pub fn page_path(&self) -> Cow<'_, str> {
        match &self.recording_path {
            Some(path) => Cow::Borrowed(path),
            None => Cow::Owned(recsite_paths::meeting_path(
                &self.organization,
                &self.meeting_topic,
                self.start_time,
            )),
        }
    }
}

/// Reference to one recorded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingFile {
    /// Asset kind as reported by the recording service (e.g. "MP4", "CHAT").
    #[serde(default)]
    pub file_type: String,
    /// Object key or URL of the asset.
    pub path: String,
}

/// Message received from the notification queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Provider-assigned message identifier.
    pub message_id: String,
    /// Handle required to delete this delivery.
    pub receipt_handle: String,
    /// Raw JSON body.
    pub body: String,
}

/// Parsed notification body identifying a changed occurrence.
///
/// Extra fields in the body are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeNotice {
    pub recording_id: String,
    pub organization: String,
    pub meeting_topic: String,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const RECORD: &str = r#"{
        "recording_id": "rec-1",
        "organization": "Acme",
        "meeting_topic": "Weekly Sync (Acme)",
        "start_time": "2024-01-01T15:02:31Z",
        "end_time": "2024-01-01T16:00:00Z",
        "files": [{"file_type": "MP4", "path": "acme/rec-1.mp4"}]
    }"#;

    #[test]
    fn test_deserialize_occurrence() {
        let occurrence: MeetingOccurrence = serde_json::from_str(RECORD).unwrap();

        assert_eq!(occurrence.recording_id, "rec-1");
        assert_eq!(occurrence.recording_path, None);
        assert_eq!(
            occurrence.files,
            vec![RecordingFile {
                file_type: "MP4".to_owned(),
                path: "acme/rec-1.mp4".to_owned(),
            }]
        );
    }

    #[test]
    fn test_page_path_derived_when_missing() {
        let occurrence: MeetingOccurrence = serde_json::from_str(RECORD).unwrap();

        assert_eq!(occurrence.page_path(), "acme/weekly-sync/2024-01-01T10:05");
    }

    #[test]
    fn test_page_path_prefers_stored_value() {
        let mut occurrence: MeetingOccurrence = serde_json::from_str(RECORD).unwrap();
        occurrence.recording_path = Some("acme/legacy/2024-01-01T10:00".to_owned());

        assert_eq!(occurrence.page_path(), "acme/legacy/2024-01-01T10:00");
    }

    #[test]
    fn test_change_notice_ignores_extra_fields() {
        let notice: ChangeNotice = serde_json::from_str(RECORD).unwrap();

        assert_eq!(
            notice,
            ChangeNotice {
                recording_id: "rec-1".to_owned(),
                organization: "Acme".to_owned(),
                meeting_topic: "Weekly Sync (Acme)".to_owned(),
            }
        );
    }

    #[test]
    fn test_change_notice_requires_keys() {
        let result = serde_json::from_str::<ChangeNotice>(r#"{"recording_id": "rec-1"}"#);

        assert!(result.is_err());
    }
}
