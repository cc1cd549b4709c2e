use std::io::{self, Write};
use thiserror::Error;

use super::Event;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Encodes events to a sink, one line per event
pub struct Encoder<W> {
    sink: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Encode one event. An unknown type fails before anything is written.
    pub fn encode(&mut self, event: &Event) -> Result<(), EncodeError> {
        let fields = event
            .event_type()
            .map(|ty| ty.fields())
            .filter(|fields| !fields.is_empty())
            .ok_or_else(|| EncodeError::UnknownEventType(event.kind.clone()))?;

        write!(self.sink, "{}", fields.len())?;
        for field in fields {
            write!(self.sink, "|{}={}", field.name(), event.value(*field))?;
        }
        self.sink.write_all(b"\n")?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Encode a single event with a fresh encoder
pub fn encode_event<W: Write>(event: &Event, sink: W) -> Result<(), EncodeError> {
    Encoder::new(sink).encode(event)
}
