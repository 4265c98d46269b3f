use std::collections::BTreeMap;

/// Source-to-target identifiers built by the room and user phases and read
/// by the message phase.
#[derive(Debug, Clone, Default)]
pub struct IdentifierMapper {
    rooms: BTreeMap<String, String>,
    users: BTreeMap<String, String>,
}

impl IdentifierMapper {
    pub fn insert_room(&mut self, source_room_id: &str, target_room_id: &str) {
        self.rooms
            .insert(source_room_id.to_string(), target_room_id.to_string());
    }

    pub fn insert_user(&mut self, source_user_id: &str, target_username: &str) {
        self.users
            .insert(source_user_id.to_string(), target_username.to_string());
    }

    pub fn room(&self, source_room_id: &str) -> Option<&str> {
        self.rooms.get(source_room_id).map(String::as_str)
    }

    pub fn user(&self, source_user_id: &str) -> Option<&str> {
        self.users.get(source_user_id).map(String::as_str)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

/// Target event ids of replayed messages, keyed by source message id.
#[derive(Debug, Clone, Default)]
pub struct EventLedger {
    events: BTreeMap<String, String>,
}

impl EventLedger {
    pub fn record(&mut self, source_message_id: &str, target_event_id: &str) {
        self.events
            .insert(source_message_id.to_string(), target_event_id.to_string());
    }

    pub fn event(&self, source_message_id: &str) -> Option<&str> {
        self.events.get(source_message_id).map(String::as_str)
    }
}
