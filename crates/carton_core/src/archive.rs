//! Name-indexed archive facade.
//!
//! [`Archive`] binds human-readable names to content keys over time. Each
//! name owns an ordered, append-only history of keys; retrieval always
//! resolves the most recent entry. A derived key-to-names reverse index is
//! kept for introspection only and is rebuildable from the forward
//! histories.

use crate::error::{CoreError, CoreResult};
use crate::key::{ContentKey, Source};
use crate::store::ContentStore;
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read, Seek};
use tracing::debug;

/// A name-indexed facade over a [`ContentStore`].
///
/// The backend is an explicit constructor parameter; any store satisfying
/// the [`ContentStore`] contract works, and the observable behavior does
/// not depend on the choice.
///
/// # State machine per name
///
/// absent -> has-versions (1 or more), monotonically advancing. There is no
/// transition back to absent: histories are never reordered or truncated.
#[derive(Debug)]
pub struct Archive<S: ContentStore> {
    store: S,
    histories: HashMap<String, Vec<ContentKey>>,
    referrers: HashMap<ContentKey, BTreeSet<String>>,
}

impl<S: ContentStore> Archive<S> {
    /// Creates an archive over the given content store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            histories: HashMap::new(),
            referrers: HashMap::new(),
        }
    }

    /// Includes a source in the archive under its logical name.
    ///
    /// Derives the content key (leaving the source's read position
    /// untouched), stores the content if the key is new, and appends the
    /// key to the name's history. Including identical content twice does
    /// not grow storage, but each call appends one history entry.
    ///
    /// Returns the derived key.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be seeked or read, or if the
    /// store fails. Duplicate content and duplicate names are not errors.
    pub fn include<R: Read + Seek>(&mut self, source: &mut Source<R>) -> CoreResult<ContentKey> {
        let key = source.content_key()?;
        self.store.include(&key, source.stream_mut())?;

        let name = source.name().to_string();
        debug!(name = %name, key = %key, "included source in archive");

        self.referrers.entry(key).or_default().insert(name.clone());
        self.histories.entry(name).or_default().push(key);
        Ok(key)
    }

    /// Returns a fresh stream over the most recent content for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NameNotFound`] if the name has no history, and
    /// the store's error if the latest key cannot be retrieved.
    pub fn get(&self, name: &str) -> CoreResult<Cursor<Vec<u8>>> {
        let key = self
            .histories
            .get(name)
            .and_then(|history| history.last())
            .ok_or_else(|| CoreError::name_not_found(name))?;
        self.store.get(key)
    }

    /// Returns whether `name` is retrievable.
    ///
    /// True iff the name has a history and the store still holds its most
    /// recent key. For an unmodified archive the second condition is
    /// always met once `include` has succeeded; it starts to matter when
    /// deletion or compaction is layered on.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.histories
            .get(name)
            .and_then(|history| history.last())
            .is_some_and(|key| self.store.has(key))
    }

    /// Returns the full version history for `name`, oldest first.
    #[must_use]
    pub fn versions(&self, name: &str) -> Option<&[ContentKey]> {
        self.histories.get(name).map(Vec::as_slice)
    }

    /// Returns every name that has ever referenced `key`.
    ///
    /// Informational only; retrieval always goes through the forward
    /// histories.
    #[must_use]
    pub fn names_for(&self, key: &ContentKey) -> Option<&BTreeSet<String>> {
        self.referrers.get(key)
    }

    /// Returns an iterator over all names with a history.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.histories.keys().map(String::as_str)
    }

    /// Returns the number of names with a history.
    #[must_use]
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    /// Returns whether the archive holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Returns a reference to the underlying content store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a mutable reference to the underlying content store.
    ///
    /// Intended for backend maintenance such as flushing a volume-backed
    /// store; the archive's own state is not affected.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
