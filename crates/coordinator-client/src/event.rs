//! The event sink (spec §6): an append-only collection keyed by
//! `(type, level, component, message)` with an optional link to a job.

use serde::Serialize;

use crate::client::CoordinatorClient;
use crate::error::Error;

/// Event kind, mirroring the closed set in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Success,
    Info,
    Warning,
    Error,
}

/// A polymorphic link from an event to the job that produced it (spec §9:
/// "Heterogeneous collections and back-references" — modeled as a
/// discriminated union rather than one nullable foreign key per job type).
#[derive(Debug, Clone, Serialize)]
pub struct JobRef {
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    r#type: EventKind,
    level: &'a str,
    component: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<JobRef>,
}

const EVENTS_COLLECTION: &str = "events";

/// Thin wrapper around `CoordinatorClient::create` for the `events`
/// collection. Does not replace the console logger (`tracing`); it is the
/// side channel logs marked with an `event` flag also go through.
pub struct EventSink<'a> {
    client: &'a CoordinatorClient,
    component: String,
}

impl<'a> EventSink<'a> {
    pub fn new(client: &'a CoordinatorClient, component: impl Into<String>) -> Self {
        Self {
            client,
            component: component.into(),
        }
    }

    pub async fn record(
        &self,
        kind: EventKind,
        level: &str,
        message: &str,
        job: Option<JobRef>,
    ) -> Result<(), Error> {
        let record = EventRecord {
            r#type: kind,
            level,
            component: &self.component,
            message,
            job,
        };
        let _: serde_json::Value = self.client.create(EVENTS_COLLECTION, &record, None).await?;
        Ok(())
    }
}
