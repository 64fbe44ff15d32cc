use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Handle, MappingId};

/// A stable handle to a [`Set`] stored in a population.
pub type SetId = Handle<Set>;

/// Delimiter used when tag lists are written as a single string.
pub const TAG_DELIMITER: char = ';';

/// A label describing the role of a set in the pipeline.
///
/// Operators select the sets they read and write by tag. The recognized roles
/// are closed variants; [`Tag::Custom`] covers user-defined labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tag {
    MainOptimizationSet,
    NonDominatedArchive,
    MatingPool,
    ForEvaluation,
    ForFitness,
    ForSelection,
    ForModification,
    ForNextIteration,
    ForDirection,
    ForCrowding,
    Fitness,
    Direction,
    ForPerturbation,
    ForFiltration,
    Filtration,
    ForConvergence,
    ForSetReplacement,
    SetReplaced,
    ForResize,
    ForNeighbourhoods,
    TempNewSolutions,
    Custom(String),
}

impl Tag {
    const NAMED: [(Tag, &'static str); 21] = [
        (Tag::MainOptimizationSet, "MAIN_OPTIMIZATION_SET"),
        (Tag::NonDominatedArchive, "NON_DOMINATED_ARCHIVE"),
        (Tag::MatingPool, "MATING_POOL"),
        (Tag::ForEvaluation, "FOR_EVALUATION"),
        (Tag::ForFitness, "FOR_FITNESS"),
        (Tag::ForSelection, "FOR_SELECTION"),
        (Tag::ForModification, "FOR_MODIFICATION"),
        (Tag::ForNextIteration, "FOR_NEXT_ITERATION"),
        (Tag::ForDirection, "FOR_DIRECTION"),
        (Tag::ForCrowding, "FOR_CROWDING"),
        (Tag::Fitness, "FITNESS"),
        (Tag::Direction, "DIRECTION"),
        (Tag::ForPerturbation, "FOR_PERTURBATION"),
        (Tag::ForFiltration, "FOR_FILTRATION"),
        (Tag::Filtration, "FILTRATION"),
        (Tag::ForConvergence, "FOR_CONVERGENCE"),
        (Tag::ForSetReplacement, "FOR_SET_REPLACEMENT"),
        (Tag::SetReplaced, "SET_REPLACED"),
        (Tag::ForResize, "FOR_RESIZE"),
        (Tag::ForNeighbourhoods, "FOR_NEIGHBOURHOODS"),
        (Tag::TempNewSolutions, "TEMP_NEW_SOLUTIONS"),
    ];

    /// Returns the canonical label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        if let Self::Custom(label) = self {
            return label;
        }
        Self::NAMED
            .iter()
            .find(|(tag, _)| tag == self)
            .map_or("", |(_, label)| *label)
    }

    /// Parses a delimited tag list such as `"FOR_SELECTION;FITNESS"`.
    ///
    /// Empty entries are skipped.
    #[must_use]
    pub fn parse_list(list: &str) -> Vec<Tag> {
        list.split(TAG_DELIMITER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Tag::from)
            .collect()
    }

    /// Joins tags into a delimited list.
    #[must_use]
    pub fn join_list(tags: &[Tag]) -> String {
        tags.iter()
            .map(Tag::as_str)
            .collect::<Vec<_>>()
            .join(&TAG_DELIMITER.to_string())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Tag {
    fn from(label: &str) -> Self {
        Self::NAMED
            .iter()
            .find(|(_, name)| *name == label)
            .map_or_else(|| Tag::Custom(label.to_owned()), |(tag, _)| tag.clone())
    }
}

impl From<String> for Tag {
    fn from(label: String) -> Self {
        Tag::from(label.as_str())
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.as_str().to_owned()
    }
}

impl FromStr for Tag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Tag::from(s))
    }
}

/// An ordered, tagged collection of mapping handles.
///
/// A set references mappings; it never owns them. The same mapping may appear
/// in any number of sets, and mutating it through one set is visible through
/// all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    members: Vec<MappingId>,
    tags: Vec<Tag>,
}

impl Set {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set carrying `tags` (duplicates dropped).
    #[must_use]
    pub fn with_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut set = Self::new();
        for tag in tags {
            set.add_tag(tag);
        }
        set
    }

    #[must_use]
    pub fn members(&self) -> &[MappingId] {
        &self.members
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<MappingId> {
        self.members.get(index).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: MappingId) -> bool {
        self.members.contains(&id)
    }

    pub fn push(&mut self, id: MappingId) {
        self.members.push(id);
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = MappingId>) {
        self.members.extend(ids);
    }

    /// Replaces the member at `index`, returning the previous handle.
    pub fn replace(&mut self, index: usize, id: MappingId) -> Option<MappingId> {
        self.members
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, id))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<MappingId> {
        (index < self.members.len()).then(|| self.members.remove(index))
    }

    /// Removes the first occurrence of `id`.
    pub fn remove(&mut self, id: MappingId) -> bool {
        match self.members.iter().position(|&m| m == id) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.members.truncate(len);
    }

    pub fn set_members(&mut self, members: Vec<MappingId>) {
        self.members = members;
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    #[must_use]
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Returns `true` if the set carries every tag in `tags`.
    #[must_use]
    pub fn has_tags(&self, tags: &[Tag]) -> bool {
        tags.iter().all(|tag| self.has_tag(tag))
    }

    /// Adds a tag; returns `false` if it was already present.
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Removes a tag; returns `false` if it was not present.
    pub fn remove_tag(&mut self, tag: &Tag) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }
}
