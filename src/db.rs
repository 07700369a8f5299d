//! Addressable sequence database.
//!
//! All sequences live in one contiguous word store; entries carry an offset
//! and length into it. Indices are dense, insertion-ordered and stable for
//! the lifetime of a run, and the collection is treated as append-only once
//! handed to a downstream module.

use crate::encode::{Sequence, SequenceView, SYMBOLS_PER_WORD};

#[derive(Debug, Clone)]
struct EntryMeta {
    description: Option<String>,
    offset: usize,
    words: usize,
    len: usize,
}

/// One database entry: a stable index, an optional description and a view
/// of the packed sequence.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub index: usize,
    pub description: Option<&'a str>,
    pub sequence: SequenceView<'a>,
}

/// An insertion-ordered collection of encoded sequences.
#[derive(Debug, Clone, Default)]
pub struct Database {
    store: Vec<u32>,
    entries: Vec<EntryMeta>,
}

impl Database {
    pub fn new() -> Self {
        Database::default()
    }

    /// Appends a sequence, copying its words into the contiguous store.
    /// Returns the new entry's index.
    pub fn push(&mut self, description: Option<String>, sequence: &Sequence) -> usize {
        let offset = self.store.len();
        self.store.extend_from_slice(sequence.words());
        self.entries.push(EntryMeta {
            description,
            offset,
            words: sequence.words().len(),
            len: sequence.len(),
        });
        self.entries.len() - 1
    }

    /// Encodes and appends raw residue text.
    pub fn push_raw(&mut self, description: Option<String>, residues: &[u8]) -> usize {
        self.push(description, &Sequence::encode(residues))
    }

    /// Number of entries.
    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; indices handed to downstream
    /// modules are dense, so a miss is a caller bug.
    pub fn get(&self, index: usize) -> Record<'_> {
        let meta = &self.entries[index];
        Record {
            index,
            description: meta.description.as_deref(),
            sequence: SequenceView::new(
                &self.store[meta.offset..meta.offset + meta.words],
                meta.len,
            ),
        }
    }

    /// The packed sequence at `index`.
    #[inline]
    pub fn sequence(&self, index: usize) -> SequenceView<'_> {
        self.get(index).sequence
    }

    pub fn iter(&self) -> impl Iterator<Item = Record<'_>> {
        (0..self.count()).map(move |i| self.get(i))
    }

    /// Total size of the word store, in symbols worth of capacity.
    pub fn packed_symbols(&self) -> usize {
        self.store.len() * SYMBOLS_PER_WORD
    }
}
