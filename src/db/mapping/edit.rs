//! Edit operations over a [`MappingSet`].
//!
//! Every operation consumes the set and returns the edited one. An index that
//! does not address an entry leaves the set unchanged. No operation checks
//! target names for emptiness or uniqueness; that is the review pass's job.

use super::{ColumnMapping, MappingPatch, MappingSet, Selection};
use crate::db::schema::ColumnDescriptor;
use crate::db::transformer::{self, TransformStep};
use crate::db::type_mapper::CanonicalType;

impl MappingSet {
    fn edit_at(mut self, index: usize, f: impl FnOnce(&mut ColumnMapping)) -> Self {
        if let Some(entry) = self.entries.get_mut(index) {
            f(entry);
        }
        self
    }

    fn edit_selected(mut self, selection: &Selection, mut f: impl FnMut(&mut ColumnMapping)) -> Self {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if selection.contains(i) {
                f(entry);
            }
        }
        self
    }

    /// Append an entry for the first source column not referenced yet, or an
    /// entry with an empty source column when every column is used.
    pub fn add_entry(mut self, source_columns: &[ColumnDescriptor]) -> Self {
        let name = {
            let used = self.referenced_sources();
            source_columns
                .iter()
                .find(|c| !used.contains(c.name.as_str()))
                .map(|c| c.name.clone())
                .unwrap_or_default()
        };
        self.entries.push(ColumnMapping::passthrough(name));
        self
    }

    /// Remove the entry at `index`; later entries move up by one.
    pub fn remove_entry(mut self, index: usize) -> Self {
        if index < self.entries.len() {
            self.entries.remove(index);
        }
        self
    }

    /// Remove every selected entry, keeping the order of the rest.
    pub fn remove_selected(self, selection: &Selection) -> Self {
        self.entries
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !selection.contains(*i))
            .map(|(_, entry)| entry)
            .collect()
    }

    /// Move the entry at `from` so that it ends up at position `to`.
    pub fn move_entry(mut self, from: usize, to: usize) -> Self {
        let len = self.entries.len();
        if from < len && to < len && from != to {
            let entry = self.entries.remove(from);
            self.entries.insert(to, entry);
        }
        self
    }

    /// Shallow-merge `patch` into the entry at `index`.
    pub fn update_entry(self, index: usize, patch: MappingPatch) -> Self {
        self.edit_at(index, |entry| patch.apply_to(entry))
    }

    /// Replace the cast step of one entry, or remove it with `None`.
    pub fn set_cast(self, index: usize, cast_to: Option<CanonicalType>) -> Self {
        self.edit_at(index, |entry| {
            entry.transforms = transformer::with_cast(&entry.transforms, cast_to);
        })
    }

    /// Replace the default step of one entry, or remove it with `None` or an
    /// empty value.
    pub fn set_default(self, index: usize, value: Option<&str>) -> Self {
        self.edit_at(index, |entry| {
            entry.transforms = transformer::with_default(&entry.transforms, value);
        })
    }

    /// Replace the extra steps (everything but cast and default) of one entry.
    pub fn set_extra_transforms(self, index: usize, extras: &[TransformStep]) -> Self {
        self.edit_at(index, |entry| {
            entry.transforms = transformer::replace_extra_steps(&entry.transforms, extras);
        })
    }

    /// Set `skip` on every selected entry. Nothing else changes.
    pub fn bulk_set_skip(self, selection: &Selection, skip: bool) -> Self {
        self.edit_selected(selection, |entry| entry.skip = skip)
    }

    /// Give every selected entry exactly one cast step, to `cast_to`.
    pub fn bulk_set_cast(self, selection: &Selection, cast_to: CanonicalType) -> Self {
        self.edit_selected(selection, |entry| {
            entry.transforms = transformer::with_cast(&entry.transforms, Some(cast_to));
        })
    }
}
