use crate::scene::ItemHandle;

/// One spawned visual element and its timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimatedItem {
    start_uppqn: u64,
    duration: u64,
    handle: ItemHandle,
}

impl AnimatedItem {
    /// A zero `duration` is bumped to one tick.
    pub fn new(start_uppqn: u64, duration: u64, handle: ItemHandle) -> Self {
        Self {
            start_uppqn,
            duration: duration.max(1),
            handle,
        }
    }

    pub fn start_uppqn(&self) -> u64 {
        self.start_uppqn
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn handle(&self) -> ItemHandle {
        self.handle
    }

    /// `(uppqn - start) / duration`; may exceed 1.0 for overdue items.
    pub fn progress_for_uppqn(&self, uppqn: u64) -> f64 {
        uppqn.saturating_sub(self.start_uppqn) as f64 / self.duration as f64
    }

    pub fn is_completed(&self, uppqn: u64) -> bool {
        uppqn.saturating_sub(self.start_uppqn) >= self.duration
    }
}

/// Live items of one animation, in spawn order.
#[derive(Debug, Default)]
pub struct ItemLedger {
    items: Vec<AnimatedItem>,
}

impl ItemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: AnimatedItem) {
        self.items.push(item);
    }

    /// Removes every item completed at `uppqn` and hands them to the caller,
    /// which owns destroying their graphical handles.
    ///
    /// Items come back in reverse insertion order.
    pub fn remove_completed(&mut self, uppqn: u64) -> Vec<AnimatedItem> {
        let mut removed = Vec::new();
        for index in (0..self.items.len()).rev() {
            if self.items[index].is_completed(uppqn) {
                removed.push(self.items.remove(index));
            }
        }
        removed
    }

    /// Empties the ledger regardless of completion.
    pub fn drain(&mut self) -> Vec<AnimatedItem> {
        std::mem::take(&mut self.items)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimatedItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
