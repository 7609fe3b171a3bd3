//! Typed façade over the coordinator's REST-like HTTP API (spec §6): CRUD +
//! list/count over job, entity and lease state, plus the event sink. This
//! crate knows nothing about job types or the claim/lease protocol — that
//! lives in `worker-engine`.

pub mod client;
pub mod error;
pub mod event;
pub mod query;

pub use client::{CoordinatorClient, CountResponse, FileUpload, FindOptions, ListResponse, MeResponse};
pub use error::Error;
pub use event::{EventKind, EventSink, JobRef};
pub use query::{Compare, Operator, Where};
