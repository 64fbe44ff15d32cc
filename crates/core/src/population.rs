use std::collections::HashSet;

use crate::{Arena, ArenaError, Mapping, MappingId, Set, SetId, Tag};

/// Storage for every mapping and set of a pipeline.
///
/// Mappings and sets live in generation-checked arenas. Sets keep their
/// creation order, which is the order tag lookups return them in.
#[derive(Debug, Default)]
pub struct Population {
    mappings: Arena<Mapping>,
    sets: Arena<Set>,
    order: Vec<SetId>,
}

impl Population {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ====================================================================
    // Mappings
    // ====================================================================

    /// Creates a population holding at most `limit` mappings at a time.
    #[must_use]
    pub fn with_mapping_limit(limit: u32) -> Self {
        Self {
            mappings: Arena::with_slot_limit(limit),
            ..Self::default()
        }
    }

    /// Stores a mapping.
    ///
    /// # Panics
    ///
    /// Panics if the mapping arena is full.
    pub fn insert_mapping(&mut self, mapping: Mapping) -> MappingId {
        self.mappings.insert(mapping)
    }

    /// Stores a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Full`] if the mapping arena is full.
    pub fn try_insert_mapping(&mut self, mapping: Mapping) -> Result<MappingId, ArenaError> {
        self.mappings.try_insert(mapping)
    }

    #[must_use]
    pub fn mapping(&self, id: MappingId) -> Option<&Mapping> {
        self.mappings.get(id)
    }

    pub fn mapping_mut(&mut self, id: MappingId) -> Option<&mut Mapping> {
        self.mappings.get_mut(id)
    }

    /// Returns mutable references to distinct mappings.
    pub fn mappings_mut(&mut self, ids: &[MappingId]) -> Option<Vec<&mut Mapping>> {
        self.mappings.get_disjoint_mut(ids)
    }

    /// Removes a mapping from the arena and from every set referencing it.
    pub fn remove_mapping(&mut self, id: MappingId) -> Option<Mapping> {
        let mapping = self.mappings.remove(id)?;
        for &set_id in &self.order {
            if let Some(set) = self.sets.get_mut(set_id) {
                set.set_members(set.members().iter().copied().filter(|&m| m != id).collect());
            }
        }
        Some(mapping)
    }

    #[must_use]
    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    /// Drops every mapping that no set references.
    ///
    /// Returns the number of mappings removed.
    pub fn sweep(&mut self) -> usize {
        let referenced: HashSet<MappingId> = self
            .order
            .iter()
            .filter_map(|&id| self.sets.get(id))
            .flat_map(|set| set.members().iter().copied())
            .collect();

        let before = self.mappings.len();
        self.mappings.retain(|id, _| referenced.contains(&id));
        before - self.mappings.len()
    }

    // ====================================================================
    // Sets
    // ====================================================================

    /// Creates an empty set with the given tags.
    pub fn create_set(&mut self, tags: impl IntoIterator<Item = Tag>) -> SetId {
        let id = self.sets.insert(Set::with_tags(tags));
        self.order.push(id);
        id
    }

    /// Stores a set built outside the population.
    ///
    /// To re-register an existing handle use [`Population::append_existing`],
    /// which refuses duplicates.
    pub fn append_set(&mut self, set: Set) -> SetId {
        let id = self.sets.insert(set);
        self.order.push(id);
        id
    }

    /// Re-registers a handle in the ordering; refuses duplicates.
    ///
    /// Returns `false` if the set is unknown or already ordered.
    pub fn append_existing(&mut self, id: SetId) -> bool {
        if !self.sets.contains(id) || self.order.contains(&id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Creates a new set referencing the same mappings as `source`.
    ///
    /// The new set carries `tags`, not the source's tags.
    pub fn clone_set(&mut self, source: SetId, tags: impl IntoIterator<Item = Tag>) -> Option<SetId> {
        let members = self.sets.get(source)?.members().to_vec();
        let id = self.create_set(tags);
        if let Some(set) = self.sets.get_mut(id) {
            set.set_members(members);
        }
        Some(id)
    }

    /// Removes a set. Its mappings stay alive until [`Population::sweep`].
    pub fn remove_set(&mut self, id: SetId) -> Option<Set> {
        let set = self.sets.remove(id)?;
        self.order.retain(|&s| s != id);
        Some(set)
    }

    #[must_use]
    pub fn set(&self, id: SetId) -> Option<&Set> {
        self.sets.get(id)
    }

    pub fn set_mut(&mut self, id: SetId) -> Option<&mut Set> {
        self.sets.get_mut(id)
    }

    /// Returns the members of a set, or an empty list for a stale handle.
    #[must_use]
    pub fn members(&self, id: SetId) -> Vec<MappingId> {
        self.sets
            .get(id)
            .map(|set| set.members().to_vec())
            .unwrap_or_default()
    }

    /// Returns every set handle in creation order.
    #[must_use]
    pub fn set_ids(&self) -> &[SetId] {
        &self.order
    }

    #[must_use]
    pub fn set_count(&self) -> usize {
        self.order.len()
    }

    /// Returns the sets carrying every tag in `tags`, in creation order.
    #[must_use]
    pub fn sets_with_tags(&self, tags: &[Tag]) -> Vec<SetId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.sets.get(id).is_some_and(|set| set.has_tags(tags)))
            .collect()
    }

    /// Returns the `index`-th set carrying `tag`.
    #[must_use]
    pub fn set_with_tag(&self, tag: &Tag, index: usize) -> Option<SetId> {
        self.sets_with_tags(std::slice::from_ref(tag))
            .get(index)
            .copied()
    }

    pub fn tag_set(&mut self, id: SetId, tag: Tag) -> bool {
        self.sets.get_mut(id).is_some_and(|set| set.add_tag(tag))
    }

    pub fn untag_set(&mut self, id: SetId, tag: &Tag) -> bool {
        self.sets.get_mut(id).is_some_and(|set| set.remove_tag(tag))
    }

    /// Appends a mapping to a set; returns `false` for a stale set handle.
    pub fn append_to_set(&mut self, set: SetId, mapping: MappingId) -> bool {
        match self.sets.get_mut(set) {
            Some(target) => {
                target.push(mapping);
                true
            }
            None => false,
        }
    }
}
