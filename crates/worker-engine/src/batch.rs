//! The typed batch a work builder hands to a handler (spec §4.2/§4.3).

/// One tick's worth of work, plus enough of the job's state that the
/// handler's output (a next cursor) is independent of later state drift.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub job_id: String,
    pub items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn new(job_id: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            job_id: job_id.into(),
            items,
        }
    }
}

/// What a work builder returns for a claimed job (spec §4.2 "Common contract").
pub enum BuildOutcome<T> {
    /// A non-empty batch to hand to the handler.
    Batch(Batch<T>),
    /// No remaining work; the builder has already transitioned the job to
    /// `completed` before returning this.
    Completed,
}

/// One item's outcome after a handler runs (spec §4.3: "one entry per input
/// item"; item-local failures are recorded, not thrown).
#[derive(Debug, Clone)]
pub struct ItemResult<T> {
    pub input_index: usize,
    pub outcome: Result<T, String>,
}

/// The full result of running a handler over a batch, plus the next cursor
/// submit should write back (spec §4.4).
pub struct HandlerOutput<T, C> {
    pub results: Vec<ItemResult<T>>,
    pub next_cursor: C,
    /// True when the builder/handler determined no further work exists
    /// under this scope, regardless of `itemsPerTick` remaining this tick.
    pub scope_exhausted: bool,
}
