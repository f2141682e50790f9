//! Bounded undo/redo over the content slice of the scene: the object and link
//! collections. Layers, selection and viewport state are deliberately outside
//! the tracked slice.

use crate::model::{CanvasLink, SceneObject};

pub const HISTORY_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub objects: Vec<SceneObject>,
    pub links: Vec<CanvasLink>,
}

#[derive(Default)]
pub struct History {
    past: Vec<Snapshot>,
    future: Vec<Snapshot>,
}

impl History {
    /// Record the state as it was before a mutation. Oldest entries are
    /// evicted past the limit; any redo branch is discarded.
    pub fn record(&mut self, prior: Snapshot) {
        self.past.push(prior);
        if self.past.len() > HISTORY_LIMIT {
            let overflow = self.past.len() - HISTORY_LIMIT;
            self.past.drain(0..overflow);
        }
        self.future.clear();
    }

    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let prev = self.past.pop()?;
        self.future.push(current);
        Some(prev)
    }

    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.future.pop()?;
        self.past.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}
