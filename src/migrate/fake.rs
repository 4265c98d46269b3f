//! Recording stand-in for the homeserver used by the migration unit tests.

use anyhow::Result;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use crate::matrix::{AdminApi, ApiResponse, CreateRoomRequest, ImpersonationApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Endpoint {
    CreateRoom,
    SearchRooms,
    ForceJoin,
    UpsertUser,
    SendMessage,
    UploadMedia,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateRoom(Value),
    SearchRooms(String),
    ForceJoin {
        room_id: String,
        user_id: String,
    },
    UpsertUser(String),
    SendMessage {
        room_id: String,
        user_id: String,
        ts: i64,
        content: Value,
    },
    UploadMedia {
        user_id: String,
        ts: i64,
        filename: String,
        mime_type: String,
        size: usize,
    },
}

/// Answers from a per-endpoint script, falling back to a success reply.
#[derive(Default)]
pub struct FakeServer {
    calls: RefCell<Vec<Call>>,
    scripted: RefCell<BTreeMap<Endpoint, VecDeque<ApiResponse>>>,
    counter: Cell<u32>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, endpoint: Endpoint, status: u16, body: Value) -> &Self {
        self.scripted
            .borrow_mut()
            .entry(endpoint)
            .or_default()
            .push_back(ApiResponse::new(status, body));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| matches(call)).count()
    }

    fn respond(&self, endpoint: Endpoint, call: Call) -> Result<ApiResponse> {
        self.calls.borrow_mut().push(call);
        if let Some(resp) = self
            .scripted
            .borrow_mut()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
        {
            return Ok(resp);
        }

        let n = self.counter.get() + 1;
        self.counter.set(n);
        let body = match endpoint {
            Endpoint::CreateRoom => json!({ "room_id": format!("!room{n}:localhost") }),
            Endpoint::SearchRooms => json!({ "rooms": [] }),
            Endpoint::ForceJoin => json!({}),
            Endpoint::UpsertUser => json!({}),
            Endpoint::SendMessage => json!({ "event_id": format!("$event{n}") }),
            Endpoint::UploadMedia => json!({ "content_uri": format!("mxc://localhost/media{n}") }),
        };
        Ok(ApiResponse::new(200, body))
    }
}

impl AdminApi for FakeServer {
    fn create_room(&self, request: &CreateRoomRequest) -> Result<ApiResponse> {
        let value = serde_json::to_value(request)?;
        self.respond(Endpoint::CreateRoom, Call::CreateRoom(value))
    }

    fn search_rooms(&self, term: &str) -> Result<ApiResponse> {
        self.respond(Endpoint::SearchRooms, Call::SearchRooms(term.to_string()))
    }

    fn force_join(&self, room_id: &str, user_id: &str) -> Result<ApiResponse> {
        self.respond(
            Endpoint::ForceJoin,
            Call::ForceJoin {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            },
        )
    }

    fn upsert_user(&self, user_id: &str) -> Result<ApiResponse> {
        self.respond(Endpoint::UpsertUser, Call::UpsertUser(user_id.to_string()))
    }
}

impl ImpersonationApi for FakeServer {
    fn send_message(
        &self,
        room_id: &str,
        user_id: &str,
        ts: i64,
        content: &Value,
    ) -> Result<ApiResponse> {
        self.respond(
            Endpoint::SendMessage,
            Call::SendMessage {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                ts,
                content: content.clone(),
            },
        )
    }

    fn upload_media(
        &self,
        user_id: &str,
        ts: i64,
        filename: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<ApiResponse> {
        self.respond(
            Endpoint::UploadMedia,
            Call::UploadMedia {
                user_id: user_id.to_string(),
                ts,
                filename: filename.to_string(),
                mime_type: mime_type.to_string(),
                size: data.len(),
            },
        )
    }
}
