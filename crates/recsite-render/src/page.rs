//! Per-kind render data.
//!
//! Each page type is built from catalog records and serialized into the
//! template context. Links between pages always come from the path
//! derivation in `recsite_paths`, so a parent page links to exactly the key
//! its child is published under.

use std::collections::BTreeSet;

use recsite_paths::{display_time, organization_path, topic_path, topic_slug};
use recsite_store::{MeetingOccurrence, RecordingFile};
use serde::Serialize;

/// Page type, selecting the template used to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Meeting,
    Topic,
    Organization,
}

impl PageKind {
    /// All kinds, in cascade order.
    pub const ALL: [Self; 3] = [Self::Meeting, Self::Topic, Self::Organization];

    /// Template file name for this kind.
    pub fn template_name(self) -> &'static str {
        match self {
            Self::Meeting => "meeting.j2.html",
            Self::Topic => "topic.j2.html",
            Self::Organization => "organization.j2.html",
        }
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Meeting => "meeting",
            Self::Topic => "topic",
            Self::Organization => "organization",
        };
        f.write_str(name)
    }
}

/// Template context for one page.
pub trait PageData: Serialize {
    /// Kind of page this data renders.
    const KIND: PageKind;

    /// Canonical path the page is published under (without `index.html`).
    fn path(&self) -> &str;
}

/// Context for a single meeting occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingPage {
    pub recording_id: String,
    pub organization: String,
    pub meeting_topic: String,
    /// Start in Eastern time, unrounded.
    pub start_time: String,
    /// End in Eastern time, unrounded.
    pub end_time: String,
    pub recording_path: String,
    pub organization_path: String,
    pub topic_path: String,
    pub files: Vec<RecordingFile>,
}

impl MeetingPage {
    /// Build the context for one occurrence.
    pub fn from_occurrence(occurrence: &MeetingOccurrence) -> Self {
        Self {
            recording_id: occurrence.recording_id.clone(),
            organization: occurrence.organization.clone(),
            meeting_topic: occurrence.meeting_topic.clone(),
            start_time: display_time(occurrence.start_time, false),
            end_time: display_time(occurrence.end_time, false),
            recording_path: occurrence.page_path().into_owned(),
            organization_path: organization_path(&occurrence.organization),
            topic_path: topic_path(&occurrence.organization, &occurrence.meeting_topic),
            files: occurrence.files.clone(),
        }
    }
}

impl PageData for MeetingPage {
    const KIND: PageKind = PageKind::Meeting;

    fn path(&self) -> &str {
        &self.recording_path
    }
}

/// Link from a topic page to one meeting page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeetingLink {
    /// Start in Eastern time, rounded to 5 minutes.
    pub start_time: String,
    /// Absolute link (`/acme/weekly-sync/2024-01-01T10:05/`).
    pub recording_path: String,
}

/// Context for a topic page listing its occurrences, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct TopicPage {
    pub organization: String,
    pub meeting_topic: String,
    pub organization_path: String,
    pub meetings: Vec<MeetingLink>,
    #[serde(skip)]
    path: String,
}

impl TopicPage {
    /// Build the context from the topic's occurrences.
    ///
    /// `occurrences` must already be limited to this organization and topic.
    /// They are listed descending by start time; equal starts keep a stable
    /// order by recording id.
    pub fn new(organization: &str, meeting_topic: &str, occurrences: &[MeetingOccurrence]) -> Self {
        let mut sorted: Vec<&MeetingOccurrence> = occurrences.iter().collect();
        sorted.sort_by(|a, b| {
            b.start_time
                .cmp(&a.start_time)
                .then_with(|| a.recording_id.cmp(&b.recording_id))
        });

        let meetings = sorted
            .into_iter()
            .map(|occurrence| MeetingLink {
                start_time: display_time(occurrence.start_time, true),
                recording_path: format!("/{}/", occurrence.page_path()),
            })
            .collect();

        Self {
            organization: organization.to_owned(),
            meeting_topic: meeting_topic.to_owned(),
            organization_path: organization_path(organization),
            meetings,
            path: topic_path(organization, meeting_topic),
        }
    }
}

impl PageData for TopicPage {
    const KIND: PageKind = PageKind::Topic;

    fn path(&self) -> &str {
        &self.path
    }
}

/// Link from an organization page to one topic page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicLink {
    pub meeting_topic: String,
    /// Absolute link (`/acme/weekly-sync/`).
    pub meeting_topic_path: String,
}

/// Context for an organization page listing its distinct topics.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationPage {
    pub organization: String,
    pub topics: Vec<TopicLink>,
    #[serde(skip)]
    path: String,
}

impl OrganizationPage {
    /// Build the context from topic names, in any order and with duplicates.
    ///
    /// Topics are listed once each, sorted by slug and then by name. Distinct
    /// names with the same slug are both listed and link to the same topic
    /// page.
    pub fn new<I, S>(organization: &str, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<(String, String)> = topics
            .into_iter()
            .map(|topic| {
                let topic = topic.as_ref();
                (topic_slug(organization, topic), topic.to_owned())
            })
            .collect();

        let topics: Vec<TopicLink> = distinct
            .into_iter()
            .map(|(_, meeting_topic)| TopicLink {
                meeting_topic_path: format!("/{}/", topic_path(organization, &meeting_topic)),
                meeting_topic,
            })
            .collect();

        // Sorted by slug, so topics sharing a page are adjacent
        for pair in topics.windows(2) {
            if pair[0].meeting_topic_path == pair[1].meeting_topic_path {
                tracing::warn!(
                    organization = %organization,
                    first = %pair[0].meeting_topic,
                    second = %pair[1].meeting_topic,
                    path = %pair[0].meeting_topic_path,
                    "Topics share one page path"
                );
            }
        }

        Self {
            organization: organization.to_owned(),
            topics,
            path: organization_path(organization),
        }
    }
}

impl PageData for OrganizationPage {
    const KIND: PageKind = PageKind::Organization;

    fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recsite_paths::parse_timestamp;

    use super::*;

    fn occurrence(id: &str, topic: &str, start: &str) -> MeetingOccurrence {
        MeetingOccurrence {
            recording_id: id.to_owned(),
            organization: "Acme".to_owned(),
            meeting_topic: topic.to_owned(),
            start_time: parse_timestamp(start).unwrap(),
            end_time: parse_timestamp(start).unwrap(),
            recording_path: None,
            files: Vec::new(),
        }
    }

    #[test]
    fn test_meeting_page_formats_times_unrounded() {
        let page = MeetingPage::from_occurrence(&occurrence(
            "rec-1",
            "Weekly Sync (Acme)",
            "2024-01-01T15:02:31Z",
        ));

        assert_eq!(page.start_time, "Monday, January 1, 2024 at 10:02 AM EST");
        assert_eq!(page.path(), "acme/weekly-sync/2024-01-01T10:05");
        assert_eq!(page.topic_path, "acme/weekly-sync");
        assert_eq!(page.organization_path, "acme");
    }

    #[test]
    fn test_topic_page_sorted_newest_first() {
        let occurrences = [
            occurrence("rec-1", "Weekly Sync (Acme)", "2024-01-01T15:02:31Z"),
            occurrence("rec-3", "Weekly Sync (Acme)", "2024-01-15T15:00:00Z"),
            occurrence("rec-2", "Weekly Sync (Acme)", "2024-01-08T15:00:00Z"),
        ];

        let page = TopicPage::new("Acme", "Weekly Sync (Acme)", &occurrences);

        let links: Vec<&str> = page
            .meetings
            .iter()
            .map(|m| m.recording_path.as_str())
            .collect();
        assert_eq!(
            links,
            vec![
                "/acme/weekly-sync/2024-01-15T10:00/",
                "/acme/weekly-sync/2024-01-08T10:00/",
                "/acme/weekly-sync/2024-01-01T10:05/",
            ]
        );
        assert_eq!(
            page.meetings[2].start_time,
            "Monday, January 1, 2024 at 10:05 AM EST"
        );
        assert_eq!(page.path(), "acme/weekly-sync");
    }

    #[test]
    fn test_topic_page_uses_stored_recording_path() {
        let mut legacy = occurrence("rec-1", "Weekly Sync (Acme)", "2024-01-01T15:02:31Z");
        legacy.recording_path = Some("acme/weekly-sync/legacy".to_owned());

        let page = TopicPage::new("Acme", "Weekly Sync (Acme)", &[legacy]);

        assert_eq!(page.meetings[0].recording_path, "/acme/weekly-sync/legacy/");
    }

    #[test]
    fn test_organization_page_dedups_and_sorts_by_slug() {
        let page = OrganizationPage::new(
            "Acme",
            ["Weekly Sync (Acme)", "Board Meeting", "Weekly Sync (Acme)", "acme budget"],
        );

        assert_eq!(
            page.topics,
            vec![
                TopicLink {
                    meeting_topic: "Board Meeting".to_owned(),
                    meeting_topic_path: "/acme/board-meeting/".to_owned(),
                },
                TopicLink {
                    meeting_topic: "acme budget".to_owned(),
                    meeting_topic_path: "/acme/budget/".to_owned(),
                },
                TopicLink {
                    meeting_topic: "Weekly Sync (Acme)".to_owned(),
                    meeting_topic_path: "/acme/weekly-sync/".to_owned(),
                },
            ]
        );
        assert_eq!(page.path(), "acme");
    }

    #[test]
    fn test_organization_page_keeps_topics_sharing_a_slug() {
        let page = OrganizationPage::new("Acme", ["Weekly Sync (Acme)", "Weekly Sync"]);

        let links: Vec<(&str, &str)> = page
            .topics
            .iter()
            .map(|t| (t.meeting_topic.as_str(), t.meeting_topic_path.as_str()))
            .collect();
        assert_eq!(
            links,
            vec![
                ("Weekly Sync", "/acme/weekly-sync/"),
                ("Weekly Sync (Acme)", "/acme/weekly-sync/"),
            ]
        );
    }

    #[test]
    fn test_organization_page_order_independent() {
        let forward = OrganizationPage::new("Acme", ["B Topic", "A Topic"]);
        let reverse = OrganizationPage::new("Acme", ["A Topic", "B Topic"]);

        assert_eq!(forward.topics, reverse.topics);
    }

    #[test]
    fn test_template_names() {
        let names: Vec<&str> = PageKind::ALL.iter().map(|k| k.template_name()).collect();
        assert_eq!(
            names,
            vec!["meeting.j2.html", "topic.j2.html", "organization.j2.html"]
        );
    }
}
