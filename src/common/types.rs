use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A to-do record tracked from the monitored group.
///
/// Field names on the wire match the JSON the todo list clients already consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "TimeStamp")]
    pub timestamp: DateTime<FixedOffset>,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "MessageID")]
    pub message_id: String,
    #[serde(rename = "IsChecked")]
    pub is_checked: bool,
    #[serde(rename = "IsDone")]
    pub is_done: bool,
    #[serde(rename = "IsDeleted")]
    pub is_deleted: bool,
}

impl ChatMessage {
    /// Fresh record with every flag cleared.
    pub fn new(
        message_id: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            timestamp,
            message: message.into(),
            message_id: message_id.into(),
            is_checked: false,
            is_done: false,
            is_deleted: false,
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timestamp: {}, Message: {}, MessageID: {}, IsChecked: {}, IsDone: {}, IsDeleted: {}",
            format_timestamp(&self.timestamp),
            self.message,
            self.message_id,
            self.is_checked,
            self.is_done,
            self.is_deleted
        )
    }
}

/// Canonical textual form used for every stored timestamp.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
}

/// One of the three independent status columns on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Checked,
    Done,
    Deleted,
}

impl Flag {
    pub fn column(self) -> &'static str {
        match self {
            Flag::Checked => "is_checked",
            Flag::Done => "is_done",
            Flag::Deleted => "is_deleted",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Checked => "checked",
            Flag::Done => "done",
            Flag::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status flag `{0}`")]
pub struct UnknownFlag(pub String);

impl FromStr for Flag {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checked" => Ok(Flag::Checked),
            "done" => Ok(Flag::Done),
            "deleted" => Ok(Flag::Deleted),
            other => Err(UnknownFlag(other.to_string())),
        }
    }
}
