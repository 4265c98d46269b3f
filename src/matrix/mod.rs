//! Homeserver boundary: admin and impersonation HTTP clients plus the
//! message content payloads they carry.

pub mod client;
pub mod content;

pub use client::{
    AdminApi, AdminClient, ApiResponse, CreateRoomRequest, ImpersonationApi, ImpersonationClient,
};

pub fn user_id(username: &str, hostname: &str) -> String {
    format!("@{username}:{hostname}")
}
