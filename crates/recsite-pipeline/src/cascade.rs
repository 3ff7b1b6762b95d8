//! Bottom-up regeneration of the pages affected by one meeting.
//!
//! A changed occurrence invalidates three pages: its own meeting page, the
//! topic page listing it, and the organization page listing the topic. They
//! are regenerated in that order so a parent page never links to a child that
//! has not been written yet.

use std::fmt;
use std::sync::Arc;

use recsite_render::{
    MeetingPage, OrganizationPage, PageData, PageKind, PageRenderer, RenderError, TopicPage,
};
use recsite_store::{Catalog, ChangeNotice, MeetingOccurrence, StoreError};

use crate::pending::PendingInvalidations;
use crate::publisher::{PagePublisher, PublishError};

/// Error that aborts a cascade.
///
/// Pages published before the failure stay published.
#[derive(Debug, thiserror::Error)]
pub enum CascadeError {
    #[error("Failed to render {kind} page {path}: {source}")]
    Render {
        kind: PageKind,
        path: String,
        #[source]
        source: RenderError,
    },
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("Catalog lookup for {kind} page ({lookup}) failed: {source}")]
    Query {
        kind: PageKind,
        lookup: String,
        #[source]
        source: StoreError,
    },
}

/// A lookup that returned nothing although a record should match it.
///
/// The affected page is skipped; the rest of the cascade proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inconsistency {
    /// Page that was not regenerated.
    pub kind: PageKind,
    /// Recording id, topic, or organization that was looked up.
    pub lookup: String,
    /// Record that triggered the lookup, if any.
    pub recording_id: Option<String>,
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no records for {} page ({})", self.kind, self.lookup)?;
        if let Some(id) = &self.recording_id {
            write!(f, " triggered by {id}")?;
        }
        Ok(())
    }
}

/// Outcome of one cascade.
#[derive(Debug, Default)]
pub struct CascadeReport {
    /// Keys written, in publish order.
    pub published: Vec<String>,
    pub inconsistencies: Vec<Inconsistency>,
}

/// Regenerates meeting, topic, and organization pages.
pub struct Cascade {
    catalog: Arc<dyn Catalog>,
    renderer: Arc<PageRenderer>,
    publisher: PagePublisher,
}

impl Cascade {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        renderer: Arc<PageRenderer>,
        publisher: PagePublisher,
    ) -> Self {
        Self {
            catalog,
            renderer,
            publisher,
        }
    }

    /// Catalog the cascade reads from.
    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// Regenerate every page affected by a change notice.
    ///
    /// The occurrence is looked up by id. If it is missing, the meeting page
    /// is skipped and recorded as an inconsistency, but the topic and
    /// organization pages are still regenerated from the notice keys.
    pub fn on_notice(
        &self,
        notice: &ChangeNotice,
        pending: &mut PendingInvalidations,
    ) -> Result<CascadeReport, CascadeError> {
        let found = self
            .catalog
            .get(&notice.recording_id)
            .map_err(|source| CascadeError::Query {
                kind: PageKind::Meeting,
                lookup: notice.recording_id.clone(),
                source,
            })?;

        if let Some(occurrence) = found {
            return self.on_meeting_changed(&occurrence, pending);
        }

        tracing::error!(
            recording_id = %notice.recording_id,
            organization = %notice.organization,
            topic = %notice.meeting_topic,
            "NONE FOUND: meeting record missing"
        );
        let mut report = CascadeReport::default();
        report.inconsistencies.push(Inconsistency {
            kind: PageKind::Meeting,
            lookup: notice.recording_id.clone(),
            recording_id: Some(notice.recording_id.clone()),
        });
        self.cascade_parents(
            &notice.organization,
            &notice.meeting_topic,
            &notice.recording_id,
            pending,
            &mut report,
        )?;
        Ok(report)
    }

    /// Regenerate the meeting page, then its topic page, then its
    /// organization page.
    pub fn on_meeting_changed(
        &self,
        occurrence: &MeetingOccurrence,
        pending: &mut PendingInvalidations,
    ) -> Result<CascadeReport, CascadeError> {
        let mut report = CascadeReport::default();
        report
            .published
            .push(self.publish_meeting(occurrence, pending)?);
        self.cascade_parents(
            &occurrence.organization,
            &occurrence.meeting_topic,
            &occurrence.recording_id,
            pending,
            &mut report,
        )?;
        Ok(report)
    }

    fn cascade_parents(
        &self,
        organization: &str,
        meeting_topic: &str,
        recording_id: &str,
        pending: &mut PendingInvalidations,
        report: &mut CascadeReport,
    ) -> Result<(), CascadeError> {
        match self.regenerate_topic(organization, meeting_topic, pending)? {
            Some(key) => report.published.push(key),
            None => report.inconsistencies.push(Inconsistency {
                kind: PageKind::Topic,
                lookup: meeting_topic.to_owned(),
                recording_id: Some(recording_id.to_owned()),
            }),
        }
        match self.regenerate_organization(organization, pending)? {
            Some(key) => report.published.push(key),
            None => report.inconsistencies.push(Inconsistency {
                kind: PageKind::Organization,
                lookup: organization.to_owned(),
                recording_id: Some(recording_id.to_owned()),
            }),
        }
        Ok(())
    }

    /// Render and publish the page of a single occurrence.
    pub fn publish_meeting(
        &self,
        occurrence: &MeetingOccurrence,
        pending: &mut PendingInvalidations,
    ) -> Result<String, CascadeError> {
        self.publish(&MeetingPage::from_occurrence(occurrence), pending)
    }

    /// Regenerate the page listing every occurrence of a topic within one
    /// organization.
    ///
    /// Returns `Ok(None)` and logs the inconsistency if the index returned no
    /// occurrences for this organization.
    pub fn regenerate_topic(
        &self,
        organization: &str,
        meeting_topic: &str,
        pending: &mut PendingInvalidations,
    ) -> Result<Option<String>, CascadeError> {
        let occurrences: Vec<MeetingOccurrence> = self
            .catalog
            .query_by_topic(meeting_topic)
            .map_err(|source| CascadeError::Query {
                kind: PageKind::Topic,
                lookup: meeting_topic.to_owned(),
                source,
            })?
            .into_iter()
            .filter(|o| o.organization == organization)
            .collect();
        tracing::debug!(
            organization = %organization,
            topic = %meeting_topic,
            count = occurrences.len(),
            "Retrieved topic occurrences"
        );

        if occurrences.is_empty() {
            tracing::error!(
                organization = %organization,
                topic = %meeting_topic,
                "NONE FOUND: topic index returned no occurrences"
            );
            return Ok(None);
        }

        let page = TopicPage::new(organization, meeting_topic, &occurrences);
        self.publish(&page, pending).map(Some)
    }

    /// Regenerate the page listing the distinct topics of an organization.
    ///
    /// Returns `Ok(None)` and logs the inconsistency if the index returned no
    /// occurrences.
    pub fn regenerate_organization(
        &self,
        organization: &str,
        pending: &mut PendingInvalidations,
    ) -> Result<Option<String>, CascadeError> {
        let occurrences = self
            .catalog
            .query_by_organization(organization)
            .map_err(|source| CascadeError::Query {
                kind: PageKind::Organization,
                lookup: organization.to_owned(),
                source,
            })?;
        tracing::debug!(
            organization = %organization,
            count = occurrences.len(),
            "Retrieved organization occurrences"
        );

        if occurrences.is_empty() {
            tracing::error!(
                organization = %organization,
                "NONE FOUND: organization index returned no occurrences"
            );
            return Ok(None);
        }

        let page = OrganizationPage::new(
            organization,
            occurrences.iter().map(|o| o.meeting_topic.as_str()),
        );
        self.publish(&page, pending).map(Some)
    }

    fn publish<P: PageData + fmt::Debug>(
        &self,
        page: &P,
        pending: &mut PendingInvalidations,
    ) -> Result<String, CascadeError> {
        tracing::debug!(kind = %P::KIND, path = %page.path(), render_input = ?page, "Render input");
        let rendered = self
            .renderer
            .render_page(page)
            .map_err(|source| CascadeError::Render {
                kind: P::KIND,
                path: page.path().to_owned(),
                source,
            })?;
        Ok(self.publisher.publish_page(&rendered, pending)?)
    }
}
