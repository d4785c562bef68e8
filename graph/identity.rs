/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Composite identity for every graph element.
//!
//! An identity pairs the id local to a data store with the id of the store
//! that produced it. The canonical string form is `storeId:localId`; the
//! store id never contains `:`, so decoding splits on the first separator
//! and local ids are free to contain it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::host::DocumentHandle;

/// Store id reserved for the primary document store.
pub const CORE_STORE_ID: &str = "core";

const SEPARATOR: char = ':';

/// Extension stripped from paths when deriving a document's display name.
const DOCUMENT_EXTENSION: &str = ".md";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity `{0}` has no store separator")]
    MissingSeparator(String),
    #[error("identity `{0}` has an empty store id")]
    EmptyStoreId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    local_id: String,
    store_id: String,
}

impl Identity {
    /// Build an identity. `store_id` must not contain `:`.
    pub fn new(local_id: impl Into<String>, store_id: impl Into<String>) -> Self {
        let store_id = store_id.into();
        debug_assert!(
            !store_id.contains(SEPARATOR),
            "store id `{store_id}` contains the identity separator"
        );
        Self {
            local_id: local_id.into(),
            store_id,
        }
    }

    /// Identity of a document in the primary store.
    pub fn core(local_id: impl Into<String>) -> Self {
        Self::new(local_id, CORE_STORE_ID)
    }

    /// Identity of a host document, keyed by its display name.
    pub fn from_document(doc: &DocumentHandle) -> Self {
        Self::core(doc.name.clone())
    }

    /// Identity of the document at `path`: the last path segment with the
    /// markdown extension removed.
    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let name = file_name
            .strip_suffix(DOCUMENT_EXTENSION)
            .unwrap_or(file_name);
        Self::core(name)
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn is_core(&self) -> bool {
        self.store_id == CORE_STORE_ID
    }

    /// Canonical `storeId:localId` form.
    pub fn encode(&self) -> String {
        format!("{}{SEPARATOR}{}", self.store_id, self.local_id)
    }

    /// Inverse of [`Identity::encode`].
    pub fn decode(encoded: &str) -> Result<Self, IdentityError> {
        let (store_id, local_id) = encoded
            .split_once(SEPARATOR)
            .ok_or_else(|| IdentityError::MissingSeparator(encoded.to_string()))?;
        if store_id.is_empty() {
            return Err(IdentityError::EmptyStoreId(encoded.to_string()));
        }
        Ok(Self {
            local_id: local_id.to_string(),
            store_id: store_id.to_string(),
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.store_id, self.local_id)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::decode(&value)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encode_puts_store_first() {
        assert_eq!(Identity::core("Home").encode(), "core:Home");
        assert_eq!(Identity::new("x", "tags").to_string(), "tags:x");
    }

    #[test]
    fn decode_splits_on_first_separator_only() {
        let id = Identity::decode("core:a:b:c").unwrap();
        assert_eq!(id.store_id(), "core");
        assert_eq!(id.local_id(), "a:b:c");
    }

    #[test]
    fn decode_accepts_empty_local_id() {
        let id = Identity::decode("core:").unwrap();
        assert_eq!(id.local_id(), "");
    }

    #[test]
    fn decode_rejects_missing_separator() {
        assert_eq!(
            Identity::decode("Home"),
            Err(IdentityError::MissingSeparator("Home".to_string()))
        );
    }

    #[test]
    fn decode_rejects_empty_store() {
        assert!(matches!(
            Identity::decode(":Home"),
            Err(IdentityError::EmptyStoreId(_))
        ));
    }

    #[test]
    fn from_path_strips_directories_and_extension() {
        assert_eq!(Identity::from_path("notes/daily/Today.md"), Identity::core("Today"));
        assert_eq!(Identity::from_path("README"), Identity::core("README"));
    }

    #[test]
    fn from_document_uses_display_name() {
        let doc = DocumentHandle::new("projects/Plan.md");
        assert_eq!(Identity::from_document(&doc), Identity::core("Plan"));
    }

    #[test]
    fn serde_uses_encoded_form() {
        let id = Identity::core("a:b");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"core:a:b\"");
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    proptest! {
        #[test]
        fn encode_decode_roundtrip(local in ".*", store in "[a-z][a-z0-9_-]{0,12}") {
            let id = Identity::new(local.clone(), store.clone());
            let decoded = Identity::decode(&id.encode()).unwrap();
            prop_assert_eq!(decoded.local_id(), local.as_str());
            prop_assert_eq!(decoded.store_id(), store.as_str());
        }

        #[test]
        fn equality_follows_encoded_form(a in "[a-z:]{0,6}", b in "[a-z:]{0,6}") {
            let left = Identity::core(a);
            let right = Identity::core(b);
            prop_assert_eq!(left == right, left.encode() == right.encode());
        }
    }
}
