//! Build-order queue with priority cut-in.

use std::collections::{BTreeSet, VecDeque};

use tracing::info;

use crate::data::ProductionTarget;

/// Why an item was pushed to the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutInReason {
    /// Supply headroom fell below the safety margin.
    Supply,
    /// Worker count crossed the expansion threshold.
    Expansion,
    /// Worker count crossed the gas threshold.
    Gas,
    /// The head item is missing a prerequisite.
    Prerequisite,
}

/// One pending production goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildItem {
    /// What to produce.
    pub target: ProductionTarget,
    /// Set when the item was cut in.
    pub cut_in: Option<CutInReason>,
}

impl BuildItem {
    /// A regular (appended) item.
    #[must_use]
    pub const fn new(target: ProductionTarget) -> Self {
        Self {
            target,
            cut_in: None,
        }
    }
}

/// FIFO of production goals.
///
/// Cut-ins only ever insert at index 0 and never touch existing items. At
/// most one cut-in per target can be queued at a time.
#[derive(Debug, Clone, Default)]
pub struct BuildOrderQueue {
    items: VecDeque<BuildItem>,
    cut_ins: BTreeSet<ProductionTarget>,
}

impl BuildOrderQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a goal.
    pub fn push_back(&mut self, target: ProductionTarget) {
        self.items.push_back(BuildItem::new(target));
    }

    /// Append several goals in order.
    pub fn extend(&mut self, targets: impl IntoIterator<Item = ProductionTarget>) {
        self.items.extend(targets.into_iter().map(BuildItem::new));
    }

    /// Put a regular item back at the front (after a failed execution).
    pub fn push_front(&mut self, target: ProductionTarget) {
        self.items.push_front(BuildItem::new(target));
    }

    /// Insert an urgent item at the front.
    ///
    /// Returns `false` and leaves the queue untouched if a cut-in for the
    /// same target is already queued.
    pub fn cut_in(&mut self, target: ProductionTarget, reason: CutInReason) -> bool {
        if !self.cut_ins.insert(target) {
            return false;
        }
        info!(target: "swarm_core::production", %target, ?reason, "cut-in");
        self.items.push_front(BuildItem {
            target,
            cut_in: Some(reason),
        });
        true
    }

    /// Check if a cut-in for `target` is queued.
    #[must_use]
    pub fn has_cut_in(&self, target: ProductionTarget) -> bool {
        self.cut_ins.contains(&target)
    }

    /// Check if `target` is queued at all.
    #[must_use]
    pub fn contains(&self, target: ProductionTarget) -> bool {
        self.items.iter().any(|i| i.target == target)
    }

    /// The next item.
    #[must_use]
    pub fn head(&self) -> Option<&BuildItem> {
        self.items.front()
    }

    /// Remove the next item.
    pub fn pop_front(&mut self) -> Option<BuildItem> {
        let item = self.items.pop_front()?;
        if item.cut_in.is_some() {
            self.cut_ins.remove(&item.target);
        }
        Some(item)
    }

    /// Iterate items front to back.
    pub fn iter(&self) -> impl Iterator<Item = &BuildItem> {
        self.items.iter()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
