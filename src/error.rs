use thiserror::Error;

/// Conditions that abort a run. Everything else is logged and skipped.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("unsupported room type `{room_type}` for room {room_id}")]
    UnsupportedRoomType { room_id: String, room_type: String },
    #[error("room alias `{alias}` is already in use but no room matched the search")]
    UnresolvableRoomConflict { alias: String },
    #[error("room creation failed for {room_id} with status {status}: {body}")]
    RoomCreationFailed {
        room_id: String,
        status: u16,
        body: String,
    },
    #[error(
        "messages are not sorted: {message_id} at {timestamp_ms} precedes previous timestamp {previous_ms}"
    )]
    MessagesOutOfOrder {
        message_id: String,
        timestamp_ms: i64,
        previous_ms: i64,
    },
    #[error("invalid timestamp `{raw}` on message {message_id}")]
    InvalidTimestamp { message_id: String, raw: String },
    #[error("failed to connect: login returned status {status}")]
    LoginFailed { status: u16 },
}
