use std::cell::Cell;
use std::rc::Rc;

/// Token for one load. Becomes stale as soon as a newer load starts.
#[derive(Debug, Clone)]
pub struct LoadToken {
    pub id: u64,
    current: Rc<Cell<u64>>,
}

impl LoadToken {
    pub fn is_current(&self) -> bool {
        self.current.get() == self.id
    }

    pub fn is_superseded(&self) -> bool {
        !self.is_current()
    }
}

/// Issues monotonically increasing load generations.
#[derive(Debug, Clone, Default)]
pub struct LoadGenerations {
    current: Rc<Cell<u64>>,
}

impl LoadGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every token issued before.
    pub fn begin(&self) -> LoadToken {
        let id = self.current.get() + 1;
        self.current.set(id);
        LoadToken { id, current: Rc::clone(&self.current) }
    }

    pub fn current(&self) -> u64 {
        self.current.get()
    }
}
