/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Markdown vault and the primary `core` data store built on it.
//!
//! [`Vault`] indexes markdown documents by display name (file stem) and keeps
//! the links and tags parsed out of each one. It doubles as the
//! [`DocumentHost`] for the command-line tool and tests. [`CoreStore`] answers
//! neighbourhood and edge queries for `core` identities from that index.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use ignore::WalkBuilder;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use pulldown_cmark::{Event, Options, Parser, Tag};
use serde_json::{Value, json};

use super::{DataStore, DataStoreError};
use crate::graph::identity::CORE_STORE_ID;
use crate::graph::{EdgeRecord, Identity, NodeRecord};
use crate::host::{DocumentHandle, DocumentHost, HostError};

const MARKDOWN_EXTENSION: &str = "md";

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("vault root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One outgoing link of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Display name of the linked document.
    pub target: String,
    /// Trimmed source line the link appears on.
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct Document {
    pub handle: DocumentHandle,
    pub content: String,
    pub links: Vec<Link>,
    pub tags: BTreeSet<String>,
}

impl Document {
    fn parse(handle: DocumentHandle, content: String) -> Self {
        let (links, tags) = parse_markdown(&content);
        Self {
            handle,
            content,
            links,
            tags,
        }
    }
}

/// In-memory index of markdown documents keyed by display name.
#[derive(Debug, Default)]
pub struct Vault {
    root: Option<PathBuf>,
    documents: RwLock<BTreeMap<String, Document>>,
    opened: Mutex<Vec<DocumentHandle>>,
}

impl Vault {
    /// Empty vault with no backing directory; created documents live only
    /// in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every `.md` file under `root`, honouring ignore files.
    pub fn load_dir(root: &Path) -> Result<Self, VaultError> {
        if !root.is_dir() {
            return Err(VaultError::NotADirectory(root.to_path_buf()));
        }
        let vault = Self {
            root: Some(root.to_path_buf()),
            ..Self::default()
        };

        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping vault entry: {err}");
                    continue;
                },
            };
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(MARKDOWN_EXTENSION)
            {
                continue;
            }
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(source) => {
                    let err = VaultError::Read {
                        path: path.to_path_buf(),
                        source,
                    };
                    warn!("Skipping document: {err}");
                    continue;
                },
            };
            let relative = path.strip_prefix(root).unwrap_or(path);
            vault.insert(relative_path_string(relative), content);
        }

        info!(
            "Loaded {} documents from {}",
            vault.len(),
            root.display()
        );
        Ok(vault)
    }

    /// Add or replace the document at `path`.
    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) -> DocumentHandle {
        let handle = DocumentHandle::new(path);
        let document = Document::parse(handle.clone(), content.into());
        if let Some(previous) = self
            .documents
            .write()
            .insert(handle.name.clone(), document)
            && previous.handle.path != handle.path
        {
            warn!(
                "Document name '{}' at {} shadows {}",
                handle.name, handle.path, previous.handle.path
            );
        }
        handle
    }

    pub fn remove(&self, name: &str) -> Option<Document> {
        self.documents.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Document> {
        self.documents.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.documents.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.documents.read().keys().cloned().collect()
    }

    /// Documents the host was asked to open, oldest first.
    pub fn opened(&self) -> Vec<DocumentHandle> {
        self.opened.lock().clone()
    }
}

impl DocumentHost for Vault {
    fn resolve(&self, local_id: &str) -> Option<DocumentHandle> {
        self.documents
            .read()
            .get(local_id)
            .map(|doc| doc.handle.clone())
    }

    fn read<'a>(&'a self, doc: &'a DocumentHandle) -> BoxFuture<'a, Result<String, HostError>> {
        Box::pin(async move {
            self.documents
                .read()
                .get(&doc.name)
                .map(|document| document.content.clone())
                .ok_or_else(|| HostError::NotFound(doc.path.clone()))
        })
    }

    fn create<'a>(&'a self, file_name: &'a str) -> BoxFuture<'a, Result<DocumentHandle, HostError>> {
        Box::pin(async move {
            let handle = DocumentHandle::new(file_name);
            if self.contains(&handle.name) {
                return Err(HostError::AlreadyExists(file_name.to_string()));
            }
            if let Some(root) = &self.root {
                let path = root.join(file_name);
                tokio::fs::write(&path, b"")
                    .await
                    .map_err(|err| HostError::Create {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    })?;
            }
            info!("Created document {file_name}");
            Ok(self.insert(file_name, String::new()))
        })
    }

    fn open(&self, doc: &DocumentHandle) {
        debug!("Opening document {}", doc.path);
        self.opened.lock().push(doc.clone());
    }
}

/// The primary data store: documents and links of a [`Vault`].
#[derive(Debug, Clone)]
pub struct CoreStore {
    vault: Arc<Vault>,
    merge_edges: bool,
}

impl CoreStore {
    pub fn new(vault: Arc<Vault>) -> Self {
        Self {
            vault,
            merge_edges: true,
        }
    }

    /// When false, every link occurrence becomes its own edge.
    pub fn with_merge_edges(mut self, merge_edges: bool) -> Self {
        self.merge_edges = merge_edges;
        self
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    fn node_record(documents: &BTreeMap<String, Document>, name: &str) -> NodeRecord {
        let record = NodeRecord::new(Identity::core(name)).with_name(name);
        match documents.get(name) {
            Some(doc) => record
                .with_data("path", Value::String(doc.handle.path.clone()))
                .with_data("tags", json!(doc.tags))
                .with_classes(
                    std::iter::once("note".to_string())
                        .chain(doc.tags.iter().map(|tag| format!("tag-{tag}"))),
                ),
            None => record.with_classes(["dangling"]),
        }
    }

    fn neighbourhood(&self, ids: &[Identity]) -> Vec<NodeRecord> {
        let documents = self.vault.documents.read();
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        let mut push = |name: &str| {
            if seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
        };

        for id in ids.iter().filter(|id| id.is_core()) {
            let name = id.local_id();
            push(name);
            if let Some(doc) = documents.get(name) {
                for link in &doc.links {
                    push(&link.target);
                }
            }
            for (source, doc) in documents.iter() {
                if doc.links.iter().any(|link| link.target == name) {
                    push(source);
                }
            }
        }

        names
            .iter()
            .map(|name| Self::node_record(&documents, name))
            .collect()
    }

    fn connections(&self, all: &[Identity], new: &[Identity]) -> Vec<EdgeRecord> {
        let core_names = |ids: &[Identity]| -> HashSet<String> {
            ids.iter()
                .filter(|id| id.is_core())
                .map(|id| id.local_id().to_string())
                .collect()
        };
        let all = core_names(all);
        let new = core_names(new);

        // (source, target) -> contexts, in first-seen order
        let mut order: Vec<(String, String)> = Vec::new();
        let mut contexts: HashMap<(String, String), Vec<String>> = HashMap::new();
        let documents = self.vault.documents.read();
        for (source, doc) in documents.iter().filter(|(name, _)| all.contains(*name)) {
            for link in &doc.links {
                if !all.contains(&link.target)
                    || !(new.contains(source) || new.contains(&link.target))
                {
                    continue;
                }
                let pair = (source.clone(), link.target.clone());
                contexts
                    .entry(pair.clone())
                    .or_insert_with(|| {
                        order.push(pair);
                        Vec::new()
                    })
                    .push(link.context.clone());
            }
        }

        let mut edges = Vec::new();
        for (source, target) in order {
            let Some(lines) = contexts.remove(&(source.clone(), target.clone())) else {
                continue;
            };
            let base = format!("{source}->{target}");
            let edge = |id: String, lines: &[String]| {
                EdgeRecord::new(Identity::core(source.as_str()), Identity::core(target.as_str()))
                    .with_id(Identity::new(id, CORE_STORE_ID))
                    .with_context(lines.join("\n"))
                    .with_data("count", json!(lines.len()))
            };
            if self.merge_edges {
                edges.push(edge(base, lines.as_slice()));
            } else {
                for (n, line) in lines.iter().enumerate() {
                    edges.push(edge(format!("{base}#{n}"), std::slice::from_ref(line)));
                }
            }
        }
        edges
    }
}

impl DataStore for CoreStore {
    fn store_id(&self) -> &str {
        CORE_STORE_ID
    }

    fn get_neighbourhood<'a>(
        &'a self,
        ids: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<NodeRecord>, DataStoreError>> {
        Box::pin(async move { Ok(self.neighbourhood(ids)) })
    }

    fn connect_nodes<'a>(
        &'a self,
        all: &'a [Identity],
        new: &'a [Identity],
    ) -> BoxFuture<'a, Result<Vec<EdgeRecord>, DataStoreError>> {
        Box::pin(async move { Ok(self.connections(all, new)) })
    }
}

fn relative_path_string(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extract links (wikilinks and `.md` markdown links, in source order) and
/// inline tags. Fenced code blocks are skipped.
fn parse_markdown(content: &str) -> (Vec<Link>, BTreeSet<String>) {
    let mut found: Vec<(usize, Link)> = Vec::new();
    let mut tags = BTreeSet::new();

    let mut in_fence = false;
    let mut line_start = 0;
    for line in content.split_inclusive('\n') {
        let offset = line_start;
        line_start += line.len();
        let trimmed = line.trim();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        for (at, target) in wikilinks(line) {
            found.push((
                offset + at,
                Link {
                    target,
                    context: trimmed.to_string(),
                },
            ));
        }
        collect_tags(line, &mut tags);
    }

    let parser = Parser::new_ext(content, Options::empty()).into_offset_iter();
    for (event, range) in parser {
        if let Event::Start(Tag::Link { dest_url, .. }) = event
            && let Some(target) = markdown_link_target(&dest_url)
        {
            found.push((
                range.start,
                Link {
                    target,
                    context: line_at(content, range.start).trim().to_string(),
                },
            ));
        }
    }

    found.sort_by_key(|(at, _)| *at);
    (found.into_iter().map(|(_, link)| link).collect(), tags)
}

/// `[[Target]]`, `[[Target|alias]]` and `[[Target#heading]]` with their
/// byte offsets in `line`.
fn wikilinks(line: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut rest = line;
    let mut consumed = 0;
    while let Some(open) = rest.find("[[") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("]]") else {
            break;
        };
        let inner = &after[..close];
        let target = inner
            .split('|')
            .next()
            .unwrap_or(inner)
            .split('#')
            .next()
            .unwrap_or(inner)
            .trim();
        let target = target.strip_suffix(".md").unwrap_or(target);
        if !target.is_empty() {
            out.push((consumed + open, target.to_string()));
        }
        let advance = open + 2 + close + 2;
        consumed += advance;
        rest = &rest[advance..];
    }
    out
}

fn markdown_link_target(dest: &str) -> Option<String> {
    if dest.contains("://") {
        return None;
    }
    let path = dest.split('#').next().unwrap_or(dest);
    let path = path.strip_suffix(".md")?;
    let name = path.rsplit('/').next().unwrap_or(path).replace("%20", " ");
    (!name.is_empty()).then_some(name)
}

fn line_at(content: &str, offset: usize) -> &str {
    let start = content[..offset].rfind('\n').map_or(0, |at| at + 1);
    let end = content[offset..]
        .find('\n')
        .map_or(content.len(), |at| offset + at);
    &content[start..end]
}

fn is_tag_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '-' | '_' | '/')
}

/// Inline `#tag` tokens. A tag starts a word and is not purely numeric.
fn collect_tags(line: &str, tags: &mut BTreeSet<String>) {
    let mut previous = None;
    for (at, ch) in line.char_indices() {
        if ch == '#' && previous.is_none_or(char::is_whitespace) {
            let tag: String = line[at + 1..].chars().take_while(|c| is_tag_char(*c)).collect();
            if !tag.is_empty() && !tag.chars().all(|c| c.is_ascii_digit()) {
                tags.insert(tag);
            }
        }
        previous = Some(ch);
    }
}
