use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomKind {
    Direct,
    Channel,
    PrivateGroup,
}

impl RoomKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "d" => Some(Self::Direct),
            "c" => Some(Self::Channel),
            "p" => Some(Self::PrivateGroup),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Channel => "channel",
            Self::PrivateGroup => "private_group",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRoom {
    #[serde(rename = "_id")]
    pub id: String,
    /// Raw type code; dispatched through [`RoomKind::from_code`].
    #[serde(rename = "t")]
    pub room_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub usernames: Vec<String>,
    #[serde(default)]
    pub announcement: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageSender {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceAttachment {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Millis(i64),
    Text(String),
    NumberLong {
        #[serde(rename = "$numberLong")]
        number_long: String,
    },
}

/// Mongo extended-JSON date wrapper: `{"$date": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportDate {
    #[serde(rename = "$date")]
    pub value: DateValue,
}

impl ExportDate {
    pub fn epoch_millis(&self) -> Option<i64> {
        match &self.value {
            DateValue::Millis(ms) => Some(*ms),
            DateValue::NumberLong { number_long } => number_long.trim().parse().ok(),
            DateValue::Text(raw) => parse_iso8601_millis(raw),
        }
    }

    pub fn raw(&self) -> String {
        match &self.value {
            DateValue::Millis(ms) => ms.to_string(),
            DateValue::NumberLong { number_long } => number_long.clone(),
            DateValue::Text(raw) => raw.clone(),
        }
    }
}

/// Offset-less timestamps are read as UTC, not in the host's local zone,
/// so a migration replays the same instants whatever machine runs it.
pub fn parse_iso8601_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceMessage {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "rid")]
    pub room_id: String,
    #[serde(rename = "u")]
    pub sender: MessageSender,
    #[serde(rename = "ts")]
    pub timestamp: ExportDate,
    #[serde(rename = "msg", default)]
    pub body: String,
    #[serde(rename = "file", default)]
    pub attachment: Option<SourceAttachment>,
    /// Thread parent message id.
    #[serde(rename = "tmid", default)]
    pub thread_parent_id: Option<String>,
}
