// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrived while a run was still in progress.
///
/// Entries are batches of task names. In `Queue` mode new triggers join the
/// newest batch, so saving three stylesheets during a `styles` run costs one
/// extra run rather than three. At most `max_runs` batches are kept.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    batches: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` below 1 is treated as 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            batches: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn record_trigger(&mut self, task: &str) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                match self.batches.back_mut() {
                    Some(batch) => {
                        batch.insert(task.to_owned());
                    }
                    None => self.batches.push_back(BTreeSet::from([task.to_owned()])),
                }
                let excess = self.batches.len().saturating_sub(self.max_runs);
                if excess > 0 {
                    warn!(excess, max_runs = self.max_runs, "trigger queue full; dropping oldest batches");
                    self.batches.drain(..excess);
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                self.batches.clear();
                self.batches.push_back(BTreeSet::from([task.to_owned()]));
            }
        }
        debug!(task, batches = self.batches.len(), "trigger queued behind running pipeline");
    }

    /// Merge every queued batch into one sorted list and empty the queue.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let merged: BTreeSet<TaskName> = self.batches.drain(..).flatten().collect();
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_triggers() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger("styles");
        q.record_trigger("styles");
        q.record_trigger("sprites");
        assert_eq!(q.drain_pending(), vec!["sprites".to_string(), "styles".to_string()]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_mode_keeps_latest_only() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        q.record_trigger("styles");
        q.record_trigger("images");
        assert_eq!(q.drain_pending(), vec!["images".to_string()]);
    }

    #[test]
    fn zero_capacity_still_holds_one_batch() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        q.record_trigger("templates");
        assert!(!q.is_empty());
    }
}
