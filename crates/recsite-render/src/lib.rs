//! HTML rendering for recordings site pages.
//!
//! Three templates are used, one per [`PageKind`]:
//!
//! - `meeting.j2.html` - a single recorded occurrence
//! - `topic.j2.html` - all occurrences of a topic, newest first
//! - `organization.j2.html` - the distinct topics of an organization
//!
//! Defaults are compiled into the binary. [`PageRenderer::load`] replaces any
//! of them with a file from a local directory or an object under a blob store
//! prefix. HTML auto-escaping is always on.
//!
//! # Example
//!
//! ```
//! use recsite_render::{OrganizationPage, PageRenderer, TemplateSource};
//!
//! let renderer = PageRenderer::load(&TemplateSource::Embedded).unwrap();
//! let page = renderer
//!     .render_page(&OrganizationPage::new("Acme", ["Weekly Sync (Acme)"]))
//!     .unwrap();
//! assert_eq!(page.path, "acme");
//! assert!(page.markup.contains(r#"href="/acme/weekly-sync/""#));
//! ```

mod page;

use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment};
use recsite_store::{BlobStore, StoreError};
use serde::Serialize;

pub use page::{
    MeetingLink, MeetingPage, OrganizationPage, PageData, PageKind, TopicLink, TopicPage,
};

const MEETING_TEMPLATE: &str = include_str!("../templates/meeting.j2.html");
const TOPIC_TEMPLATE: &str = include_str!("../templates/topic.j2.html");
const ORGANIZATION_TEMPLATE: &str = include_str!("../templates/organization.j2.html");

/// Rendering error.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Template failed to compile or render.
    #[error("Template {name} failed: {source}")]
    Template {
        name: &'static str,
        #[source]
        source: minijinja::Error,
    },
    /// Template override could not be read from disk.
    #[error("Failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Template override could not be read from the blob store.
    #[error("Failed to load template {key}: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },
    /// Template override is not UTF-8.
    #[error("Template {key} is not valid UTF-8")]
    Encoding {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Where template overrides come from.
pub enum TemplateSource<'a> {
    /// Built-in templates only.
    Embedded,
    /// Files named after each template in a local directory.
    Directory(&'a Path),
    /// Objects `{prefix}/{template}` in a blob store.
    Blob {
        store: &'a dyn BlobStore,
        prefix: &'a str,
    },
}

impl TemplateSource<'_> {
    /// Read the override for one template, if present.
    fn read(&self, name: &'static str) -> Result<Option<String>, RenderError> {
        match self {
            Self::Embedded => Ok(None),
            Self::Directory(dir) => {
                let path = dir.join(name);
                if !path.is_file() {
                    return Ok(None);
                }
                std::fs::read_to_string(&path)
                    .map(Some)
                    .map_err(|source| RenderError::Io { path, source })
            }
            Self::Blob { store, prefix } => {
                let prefix = prefix.trim_matches('/');
                let key = if prefix.is_empty() {
                    name.to_owned()
                } else {
                    format!("{prefix}/{name}")
                };
                let Some(bytes) = store.get(&key).map_err(|source| RenderError::Store {
                    key: key.clone(),
                    source,
                })?
                else {
                    return Ok(None);
                };
                String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|source| RenderError::Encoding { key, source })
            }
        }
    }
}

/// A rendered page ready for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub kind: PageKind,
    /// Canonical path (without `index.html`).
    pub path: String,
    pub markup: String,
}

/// Renders page contexts into HTML.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    /// Build a renderer, applying overrides from `source`.
    ///
    /// Templates missing from `source` use the built-in defaults. Every
    /// template is compiled up front so syntax errors surface here rather
    /// than on first use.
    pub fn load(source: &TemplateSource<'_>) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        for kind in PageKind::ALL {
            let name = kind.template_name();
            let body = if let Some(custom) = source.read(name)? {
                tracing::info!(template = name, "Using template override");
                custom
            } else {
                default_template(kind).to_owned()
            };
            env.add_template_owned(name, body)
                .map_err(|source| RenderError::Template { name, source })?;
        }

        Ok(Self { env })
    }

    /// Render `data` with the template for `kind`.
    pub fn render(&self, kind: PageKind, data: &impl Serialize) -> Result<String, RenderError> {
        let name = kind.template_name();
        self.env
            .get_template(name)
            .and_then(|template| template.render(data))
            .map_err(|source| RenderError::Template { name, source })
    }

    /// Render a typed page context.
    pub fn render_page<P: PageData>(&self, page: &P) -> Result<RenderedPage, RenderError> {
        let markup = self.render(P::KIND, page)?;
        Ok(RenderedPage {
            kind: P::KIND,
            path: page.path().to_owned(),
            markup,
        })
    }
}

fn default_template(kind: PageKind) -> &'static str {
    match kind {
        PageKind::Meeting => MEETING_TEMPLATE,
        PageKind::Topic => TOPIC_TEMPLATE,
        PageKind::Organization => ORGANIZATION_TEMPLATE,
    }
}
