//! Path and slug derivation.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};

use crate::time::round_start;

/// Characters replaced by spaces before slugging.
const PUNCTUATION: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '[', ']', '{', '}', ';', ':', ',', '.', '/',
    '<', '>', '?', '\\', '|', '`', '~', '=', '_', '+',
];

/// Format of the rounded start segment (Eastern local time).
const START_FORMAT: &str = "%Y-%m-%dT%H:%M";

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\W]+").unwrap());

/// Derive the canonical path for an organization, topic, or meeting.
///
/// `start` is only used together with `topic`: an organization path never
/// carries a time component. A topic that normalizes to an empty slug yields
/// the organization path.
pub fn derive(organization: &str, topic: Option<&str>, start: Option<DateTime<Utc>>) -> String {
    let mut path = organization_path(organization);

    let Some(topic) = topic else {
        return path;
    };
    let slug = topic_slug(organization, topic);
    if slug.is_empty() {
        tracing::warn!(
            organization = %organization,
            topic = %topic,
            "Topic slug is empty, page collapses onto the organization path"
        );
        return path;
    }

    path.push('/');
    path.push_str(&slug);

    if let Some(start) = start {
        path.push('/');
        path.push_str(&round_start(start).format(START_FORMAT).to_string());
    }

    path
}

/// Path of an organization page (`acme`).
pub fn organization_path(organization: &str) -> String {
    organization.to_lowercase()
}

/// Path of a topic page (`acme/weekly-sync`).
pub fn topic_path(organization: &str, topic: &str) -> String {
    derive(organization, Some(topic), None)
}

/// Path of a meeting page (`acme/weekly-sync/2024-01-01T10:05`).
pub fn meeting_path(organization: &str, topic: &str, start: DateTime<Utc>) -> String {
    derive(organization, Some(topic), Some(start))
}

/// Normalize a meeting topic into a URL slug.
///
/// The organization name is removed from the topic (case-insensitive,
/// optionally parenthesized), punctuation becomes whitespace, and runs of
/// non-word characters collapse into single hyphens.
pub fn topic_slug(organization: &str, topic: &str) -> String {
    let stripped = strip_organization(organization, topic);
    let spaced: String = stripped
        .chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();
    SEPARATOR_RE
        .replace_all(&spaced, "-")
        .trim_matches('-')
        .to_lowercase()
}

fn strip_organization(organization: &str, topic: &str) -> String {
    if organization.is_empty() {
        return topic.to_owned();
    }
    let pattern = format!(r"\s*\(?{}\)?\s*", regex::escape(organization));
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.replace_all(topic, "").into_owned(),
        // Only reachable when the escaped name exceeds the regex size limit.
        Err(_) => topic.to_owned(),
    }
}
