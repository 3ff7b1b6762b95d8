//! Shared fixtures for pipeline tests.

use std::sync::Arc;

use chrono::TimeDelta;
use recsite_paths::parse_timestamp;
use recsite_render::{PageRenderer, TemplateSource};
use recsite_store::{BlobStore, Catalog, MeetingOccurrence, MockBlobStore, MockCatalog};

use crate::cascade::Cascade;
use crate::publisher::PagePublisher;

pub(crate) fn occurrence(
    id: &str,
    organization: &str,
    topic: &str,
    start: &str,
) -> MeetingOccurrence {
    let start_time = parse_timestamp(start).unwrap();
    MeetingOccurrence {
        recording_id: id.to_owned(),
        organization: organization.to_owned(),
        meeting_topic: topic.to_owned(),
        start_time,
        end_time: start_time + TimeDelta::hours(1),
        recording_path: None,
        files: Vec::new(),
    }
}

pub(crate) fn notice_body(id: &str, organization: &str, topic: &str) -> String {
    serde_json::json!({
        "recording_id": id,
        "organization": organization,
        "meeting_topic": topic,
    })
    .to_string()
}

pub(crate) fn cascade(catalog: MockCatalog, store: &Arc<MockBlobStore>) -> Cascade {
    let renderer = PageRenderer::load(&TemplateSource::Embedded).unwrap();
    Cascade::new(
        Arc::new(catalog) as Arc<dyn Catalog>,
        Arc::new(renderer),
        PagePublisher::new(Arc::clone(store) as Arc<dyn BlobStore>),
    )
}
