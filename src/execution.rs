//! Per-request match state and its pool.
//!
//! Matching fills a [`RouteExecution`] instead of allocating result
//! collections on every request; executions are recycled through a small
//! free-list. Pooling is purely an allocation optimisation: correctness does
//! not depend on it.

use crate::handler::{Handler, Middleware};
use std::sync::{Arc, Mutex};

/// The complete instructions for serving one request, produced by a tree
/// walk.
#[derive(Default)]
pub(crate) struct RouteExecution {
    /// The canonical matched pattern, parameter placeholders preserved.
    pub(crate) pattern: String,
    /// Decoded parameter bindings, in descent order.
    pub(crate) params: Vec<(String, String)>,
    /// The deepest NotFound handler seen during descent.
    pub(crate) not_found: Option<Arc<dyn Handler>>,
    /// All middleware crossed during descent, in attachment order.
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
    /// The selected handler, if any applies.
    pub(crate) handler: Option<Arc<dyn Handler>>,
}

impl RouteExecution {
    fn reset(&mut self) {
        self.pattern.clear();
        self.params.clear();
        self.not_found = None;
        self.middleware.clear();
        self.handler = None;
    }
}

/// Executions kept around between requests. Beyond this the free-list stops
/// growing and released executions are dropped.
const MAX_POOLED: usize = 64;

/// A concurrency-safe free-list of [`RouteExecution`]s.
///
/// The lock is held only to pop or push; it is never held across an await
/// point.
pub(crate) struct ExecutionPool {
    free: Mutex<Vec<RouteExecution>>,
}

impl ExecutionPool {
    pub(crate) fn new() -> Self {
        ExecutionPool {
            free: Mutex::new(Vec::new()),
        }
    }

    /// Returns a zeroed execution, reusing a pooled one when available.
    pub(crate) fn acquire(&self) -> RouteExecution {
        let mut ex = self
            .free
            .lock()
            .expect("execution pool lock poisoned")
            .pop()
            .unwrap_or_default();
        ex.reset();
        ex
    }

    /// Stores an execution for reuse.
    pub(crate) fn release(&self, mut ex: RouteExecution) {
        ex.reset();
        let mut free = self.free.lock().expect("execution pool lock poisoned");
        if free.len() < MAX_POOLED {
            free.push(ex);
        }
    }
}
