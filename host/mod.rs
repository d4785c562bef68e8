/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Narrow interfaces onto the host document application.
//!
//! The view never touches the host's file system or renderer directly: it
//! resolves, reads, creates and opens documents through [`DocumentHost`] and
//! turns markdown into preview HTML through [`PreviewRenderer`].

use futures_util::future::BoxFuture;
use pulldown_cmark::{Options, Parser, html};

pub mod preview;

pub use preview::MarkdownPreview;

/// Handle to a host document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    /// Host path, `/`-separated.
    pub path: String,
    /// Display name (file stem).
    pub name: String,
}

impl DocumentHandle {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = path.rsplit('/').next().unwrap_or(&path);
        let name = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => file_name.to_string(),
        };
        Self { path, name }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to create {path}: {reason}")]
    Create { path: String, reason: String },
}

/// Document access offered by the host application.
pub trait DocumentHost: Send + Sync {
    /// Resolve a local identity (display name) to a document, if one exists.
    fn resolve(&self, local_id: &str) -> Option<DocumentHandle>;

    /// Read a document's markdown source.
    fn read<'a>(&'a self, doc: &'a DocumentHandle) -> BoxFuture<'a, Result<String, HostError>>;

    /// Create an empty document at `file_name`.
    fn create<'a>(&'a self, file_name: &'a str) -> BoxFuture<'a, Result<DocumentHandle, HostError>>;

    /// Ask the host to open `doc` in its editor.
    fn open(&self, doc: &DocumentHandle);
}

/// Renders a markdown string to an HTML fragment for `source_path`.
pub trait PreviewRenderer: Send + Sync {
    fn render(&self, markdown: &str, source_path: &str) -> String;
}

pub(crate) fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_name_is_file_stem() {
        let doc = DocumentHandle::new("a/b/Reading List.md");
        assert_eq!(doc.name, "Reading List");
        assert_eq!(doc.path, "a/b/Reading List.md");
    }

    #[test]
    fn handle_without_extension_keeps_name() {
        assert_eq!(DocumentHandle::new("Inbox").name, "Inbox");
        assert_eq!(DocumentHandle::new(".hidden").name, ".hidden");
    }

    #[test]
    fn markdown_renders_to_html() {
        let html = markdown_to_html("# Title\n\nsome *text*");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }
}
