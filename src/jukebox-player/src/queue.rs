use jukebox_core::{QueueSort, Track};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(pub u64);

impl QueueId {
    fn next(seed: &mut u64) -> Self {
        let id = *seed;
        *seed = seed.saturating_add(1);
        QueueId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub id: QueueId,
    pub track: Track,
}

/// The active play queue. Appends only; the current index moves with playback.
#[derive(Debug, Default, Clone)]
pub struct Queue {
    items: Vec<QueueItem>,
    current: Option<usize>,
    next_id: u64,
    sort: QueueSort,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort(sort: QueueSort) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn sort(&self) -> QueueSort {
        self.sort
    }

    pub fn set_sort(&mut self, sort: QueueSort) {
        self.sort = sort;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.current.and_then(|idx| self.items.get(idx))
    }

    pub fn current_mut(&mut self) -> Option<&mut QueueItem> {
        self.current.and_then(|idx| self.items.get_mut(idx))
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn enqueue_back(&mut self, track: Track) -> QueueId {
        let id = QueueId::next(&mut self.next_id);
        self.items.push(QueueItem { id, track });
        id
    }

    /// Sort a batch by the queue's sort settings and append it.
    ///
    /// Returns the ids in queue order; the first id is the first track of the
    /// sorted batch.
    pub fn append_sorted(&mut self, mut tracks: Vec<Track>) -> Vec<QueueId> {
        self.sort.sort(&mut tracks);
        tracks
            .into_iter()
            .map(|track| self.enqueue_back(track))
            .collect()
    }

    pub fn select_first(&mut self) -> Option<&QueueItem> {
        self.select_index(0)
    }

    pub fn select_index(&mut self, index: usize) -> Option<&QueueItem> {
        if index < self.items.len() {
            self.current = Some(index);
            self.current()
        } else {
            None
        }
    }

    pub fn select_id(&mut self, id: QueueId) -> Option<&QueueItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        self.select_index(index)
    }

    pub fn advance(&mut self) -> Option<&QueueItem> {
        match self.current {
            Some(idx) if idx + 1 < self.items.len() => {
                self.current = Some(idx + 1);
                self.current()
            }
            _ => {
                self.current = None;
                None
            }
        }
    }

    pub fn previous(&mut self) -> Option<&QueueItem> {
        match self.current {
            Some(idx) if idx > 0 => {
                self.current = Some(idx - 1);
                self.current()
            }
            _ => None,
        }
    }

    pub fn reset_current(&mut self) {
        self.current = None;
    }
}
