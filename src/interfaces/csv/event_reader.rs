use crate::domain::account::UserId;
use crate::domain::action::{EventKind, InboundEvent};
use crate::domain::ports::MessageRef;
use crate::domain::withdrawal::Identity;
use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::io::Read;

/// One row of a replay script: `user, kind, payload, name, handle, message`.
///
/// `message` is the id of the message a button press came from.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct EventRecord {
    pub user: UserId,
    pub kind: EventKind,
    pub payload: String,
    pub name: Option<String>,
    pub handle: Option<String>,
    pub message: Option<u64>,
}

impl From<EventRecord> for InboundEvent {
    fn from(record: EventRecord) -> Self {
        let identity = Identity {
            user_id: record.user,
            display_name: record.name.unwrap_or_else(|| record.user.to_string()),
            handle: record.handle.map(|h| h.trim_start_matches('@').to_string()),
        };
        InboundEvent {
            identity,
            kind: record.kind,
            payload: record.payload,
            message: record.message.map(MessageRef),
        }
    }
}

/// Reads inbound events from a CSV source.
///
/// Fields are trimmed and short rows are accepted, so the optional `name`,
/// `handle` and `message` columns can be left off.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes rows; a bad row yields an error and the stream goes on.
    pub fn events(self) -> impl Iterator<Item = Result<InboundEvent>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| result.map(InboundEvent::from).map_err(EngineError::from))
    }
}
