use std::collections::HashSet;

/// Opaque Hacker News item identifier.
pub type StoryId = u64;

/// Ordered, duplicate-free list of story ids. Row `n` of the list view is
/// `ids()[n]`.
///
/// Existing ids never move and are never removed, so a row keeps pointing at
/// the same story across refreshes except for the offset introduced by newly
/// prepended stories.
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    ids: Vec<StoryId>,
    known: HashSet<StoryId>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a freshly fetched newest-first index. Unknown ids are prepended
    /// in their fetched order; known ids stay where they are.
    ///
    /// Returns how many ids were added.
    pub fn merge(&mut self, fetched: &[StoryId]) -> usize {
        let fresh: Vec<StoryId> = fetched
            .iter()
            .rev()
            .copied()
            .filter(|id| self.known.insert(*id))
            .collect();
        if fresh.is_empty() {
            return 0;
        }
        let added = fresh.len();
        // `fresh` is oldest-first; front-inserting one by one reverses it back.
        self.ids.splice(0..0, fresh.into_iter().rev());
        added
    }

    pub fn get(&self, row: usize) -> Option<StoryId> {
        self.ids.get(row).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: StoryId) -> bool {
        self.known.contains(&id)
    }

    pub fn position(&self, id: StoryId) -> Option<usize> {
        // linear, but only after the set says it is there
        if !self.contains(id) {
            return None;
        }
        self.ids.iter().position(|known| *known == id)
    }

    pub fn ids(&self) -> &[StoryId] {
        &self.ids
    }
}
