use std::collections::HashMap;

/// Id that jumps back to the page visited before the last marker jump.
pub const LAST_MARKER: char = '\'';

pub fn is_valid_marker_id(id: char) -> bool {
    ('0'..='z').contains(&id)
}

/// Per-document marker set. Cleared when the document closes.
#[derive(Debug, Default, Clone)]
pub struct MarkerSet {
    markers: HashMap<char, usize>,
    last: Option<usize>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `page` under `id`. Returns false for ids outside `'0'..='z'`.
    pub fn add(&mut self, id: char, page: usize) -> bool {
        if !is_valid_marker_id(id) {
            return false;
        }
        self.markers.insert(id, page);
        self.last = Some(page);
        true
    }

    /// Page to jump to for `id`, updating the "last" marker to `current`.
    /// [`LAST_MARKER`] swaps the last marker with the current page.
    pub fn jump(&mut self, id: char, current: usize) -> Option<usize> {
        let target = if id == LAST_MARKER {
            self.last
        } else {
            self.markers.get(&id).copied()
        }?;
        self.last = Some(current);
        Some(target)
    }

    pub fn get(&self, id: char) -> Option<usize> {
        self.markers.get(&id).copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.last
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.last = None;
    }
}
