//! Write-only, pipe-delimited event encoding
//!
//! Each event becomes one line: `<field_count>(|<name>=<value>)*\n`, where the
//! fields and their order come from a fixed per-type table.

mod encoder;

pub use encoder::{EncodeError, Encoder, encode_event};

use chrono::{NaiveDateTime, Timelike};
use std::fmt;
use std::str::FromStr;

/// Known event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    View,
    Enter,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Click, EventType::View, EventType::Enter];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::View => "view",
            EventType::Enter => "enter",
        }
    }

    /// Fields emitted for this type, in wire order
    pub fn fields(&self) -> &'static [Field] {
        match self {
            EventType::Click => &[Field::Time, Field::User],
            EventType::View => &[Field::Time, Field::User, Field::Url],
            EventType::Enter => &[Field::User, Field::Url, Field::Site],
        }
    }
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(EventType::Click),
            "view" => Ok(EventType::View),
            "enter" => Ok(EventType::Enter),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named event attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Time,
    User,
    Url,
    Site,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Time => "time",
            Field::User => "user",
            Field::Url => "url",
            Field::Site => "site",
        }
    }
}

/// An event record. The type is kept as its raw tag so records of unknown
/// types can exist and be rejected at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub time: NaiveDateTime,
    pub user: String,
    pub url: String,
    pub site: String,
}

impl Event {
    pub fn new(
        kind: impl Into<String>,
        time: NaiveDateTime,
        user: impl Into<String>,
        url: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            time,
            user: user.into(),
            url: url.into(),
            site: site.into(),
        }
    }

    /// Parsed type tag, `None` for unregistered types
    pub fn event_type(&self) -> Option<EventType> {
        self.kind.parse().ok()
    }

    pub fn value(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::Time => FieldValue::Timestamp(self.time),
            Field::User => FieldValue::Text(&self.user),
            Field::Url => FieldValue::Text(&self.url),
            Field::Site => FieldValue::Text(&self.site),
        }
    }
}

/// A field's value as written to the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Timestamp(NaiveDateTime),
    Text(&'a str),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Timestamp(t) => write_isoformat(f, t),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// ISO-8601 with microsecond precision; the fraction is omitted when zero
fn write_isoformat(f: &mut fmt::Formatter<'_>, t: &NaiveDateTime) -> fmt::Result {
    let micros = t.nanosecond() % 1_000_000_000 / 1_000;
    write!(f, "{}", t.format("%Y-%m-%dT%H:%M:%S"))?;
    if micros != 0 {
        write!(f, ".{micros:06}")?;
    }
    Ok(())
}

/// Timestamp rendered the way it appears in an encoded record
pub fn isoformat(t: &NaiveDateTime) -> String {
    FieldValue::Timestamp(*t).to_string()
}
