use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const LOGIN_DEVICE_ID: &str = "rc2m";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Status and decoded body of a homeserver reply. Non-JSON bodies are kept
/// as a JSON string so callers can still log them.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn errcode(&self) -> Option<&str> {
        self.str_field("errcode")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomRequest {
    pub visibility: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_alias_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_rules: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_direct: bool,
}

/// Calls made with the server administrator's access token.
pub trait AdminApi {
    fn create_room(&self, request: &CreateRoomRequest) -> Result<ApiResponse>;
    fn search_rooms(&self, term: &str) -> Result<ApiResponse>;
    fn force_join(&self, room_id: &str, user_id: &str) -> Result<ApiResponse>;
    /// Create-or-update a non-admin account.
    fn upsert_user(&self, user_id: &str) -> Result<ApiResponse>;
}

/// Calls made with the application-service token on behalf of `user_id`,
/// stamped with `ts` (epoch milliseconds).
pub trait ImpersonationApi {
    fn send_message(
        &self,
        room_id: &str,
        user_id: &str,
        ts: i64,
        content: &Value,
    ) -> Result<ApiResponse>;
    fn upload_media(
        &self,
        user_id: &str,
        ts: i64,
        filename: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<ApiResponse>;
}

fn build_http() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("failed to build http client")
}

fn execute(request: RequestBuilder, endpoint: &str) -> Result<ApiResponse> {
    let response = request
        .send()
        .with_context(|| format!("request to {endpoint} failed"))?;
    let status = response.status().as_u16();
    let text = response
        .text()
        .with_context(|| format!("failed to read response from {endpoint}"))?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    debug!(endpoint, status, %body, "homeserver response");
    Ok(ApiResponse::new(status, body))
}

pub fn login(api_base: &str, username: &str, password: &str) -> Result<ApiResponse> {
    let endpoint = format!("{api_base}/_matrix/client/v3/login");
    let payload = serde_json::json!({
        "type": "m.login.password",
        "identifier": {"type": "m.id.user", "user": username},
        "password": password,
        "device_id": LOGIN_DEVICE_ID,
    });
    let http = build_http()?;
    execute(http.post(&endpoint).json(&payload), &endpoint)
}

pub struct AdminClient {
    http: Client,
    api_base: String,
    token: String,
}

impl AdminClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_http()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

impl AdminApi for AdminClient {
    fn create_room(&self, request: &CreateRoomRequest) -> Result<ApiResponse> {
        let endpoint = format!("{}/_matrix/client/v3/createRoom", self.api_base);
        let req = self.http.post(&endpoint).bearer_auth(&self.token).json(request);
        execute(req, &endpoint)
    }

    fn search_rooms(&self, term: &str) -> Result<ApiResponse> {
        let endpoint = format!("{}/_synapse/admin/v1/rooms", self.api_base);
        let req = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.token)
            .query(&[("search_term", term)]);
        execute(req, &endpoint)
    }

    fn force_join(&self, room_id: &str, user_id: &str) -> Result<ApiResponse> {
        let endpoint = format!("{}/_synapse/admin/v1/join/{room_id}", self.api_base);
        let req = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "user_id": user_id }));
        execute(req, &endpoint)
    }

    fn upsert_user(&self, user_id: &str) -> Result<ApiResponse> {
        let endpoint = format!("{}/_synapse/admin/v2/users/{user_id}", self.api_base);
        let req = self
            .http
            .put(&endpoint)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "admin": false }));
        execute(req, &endpoint)
    }
}

pub struct ImpersonationClient {
    http: Client,
    api_base: String,
    token: String,
}

impl ImpersonationClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_http()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

/// Export MIME types are untrusted; anything that is not a legal header
/// value is uploaded as an opaque blob.
fn upload_content_type(mime_type: &str) -> HeaderValue {
    HeaderValue::from_str(mime_type).unwrap_or_else(|_| {
        warn!(mime_type = ?mime_type, fallback = FALLBACK_MIME_TYPE, "invalid attachment mime type");
        HeaderValue::from_static(FALLBACK_MIME_TYPE)
    })
}

impl ImpersonationApi for ImpersonationClient {
    fn send_message(
        &self,
        room_id: &str,
        user_id: &str,
        ts: i64,
        content: &Value,
    ) -> Result<ApiResponse> {
        let endpoint = format!(
            "{}/_matrix/client/v3/rooms/{room_id}/send/m.room.message",
            self.api_base
        );
        let ts = ts.to_string();
        let req = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.token)
            .query(&[("user_id", user_id), ("ts", ts.as_str())])
            .json(content);
        execute(req, &endpoint)
    }

    fn upload_media(
        &self,
        user_id: &str,
        ts: i64,
        filename: &str,
        mime_type: &str,
        data: Vec<u8>,
    ) -> Result<ApiResponse> {
        let endpoint = format!("{}/_matrix/media/v3/upload", self.api_base);
        let ts = ts.to_string();
        let req = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.token)
            .query(&[
                ("user_id", user_id),
                ("ts", ts.as_str()),
                ("filename", filename),
            ])
            .header(CONTENT_TYPE, upload_content_type(mime_type))
            .body(data);
        execute(req, &endpoint)
    }
}
