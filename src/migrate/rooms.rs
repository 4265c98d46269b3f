use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::MigrationError;
use crate::matrix::{AdminApi, ApiResponse, CreateRoomRequest};
use crate::migrate::mapper::IdentifierMapper;
use crate::rocketchat::model::{RoomKind, SourceRoom};

pub const DIRECT_ROOM_PREFIX: &str = "ZZ-";
pub const DIRECT_NAME_SEPARATOR: &str = "-";
const ROOM_IN_USE: &str = "M_ROOM_IN_USE";

#[derive(Debug, Clone, Default, Serialize)]
pub struct RoomPhaseStats {
    pub created: usize,
    pub resolved: usize,
}

pub fn direct_room_name(usernames: &[String]) -> String {
    format!(
        "{DIRECT_ROOM_PREFIX}{}",
        usernames.join(DIRECT_NAME_SEPARATOR)
    )
}

/// Map a source room onto `createRoom` parameters.
pub fn room_request(room: &SourceRoom) -> Result<CreateRoomRequest> {
    let kind =
        RoomKind::from_code(&room.room_type).ok_or_else(|| MigrationError::UnsupportedRoomType {
            room_id: room.id.clone(),
            room_type: room.room_type.clone(),
        })?;

    if kind == RoomKind::Direct {
        return Ok(CreateRoomRequest {
            visibility: "private",
            name: direct_room_name(&room.usernames),
            room_alias_name: None,
            topic: None,
            join_rules: Some("invite"),
            is_direct: true,
        });
    }

    let name = room
        .name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| anyhow!("{} room {} has no name", kind.label(), room.id))?;
    let (visibility, join_rules) = match kind {
        RoomKind::Channel => ("public", None),
        _ => ("private", Some("invite")),
    };

    Ok(CreateRoomRequest {
        visibility,
        room_alias_name: Some(name.clone()),
        name,
        topic: room.announcement.clone(),
        join_rules,
        is_direct: false,
    })
}

fn first_search_match(resp: &ApiResponse) -> Option<&str> {
    resp.body
        .get("rooms")
        .and_then(Value::as_array)
        .and_then(|rooms| rooms.first())
        .and_then(|room| room.get("room_id"))
        .and_then(Value::as_str)
}

fn resolve_existing(admin: &dyn AdminApi, name: &str) -> Result<String> {
    let resp = admin.search_rooms(name)?;
    match first_search_match(&resp) {
        Some(room_id) => Ok(room_id.to_string()),
        None => Err(MigrationError::UnresolvableRoomConflict {
            alias: name.to_string(),
        }
        .into()),
    }
}

/// Create one target room, or resolve the existing one when its alias is
/// taken, and record the mapping.
pub fn migrate_room(
    room: &SourceRoom,
    admin: &dyn AdminApi,
    mapper: &mut IdentifierMapper,
    stats: &mut RoomPhaseStats,
) -> Result<()> {
    let request = room_request(room)?;
    debug!(room = %room.id, name = %request.name, "creating room");
    let resp = admin.create_room(&request)?;

    let target = if resp.is_success() {
        stats.created += 1;
        resp.str_field("room_id")
            .map(str::to_string)
            .with_context(|| format!("createRoom for {} returned no room_id", room.id))?
    } else if resp.status == 400 && resp.errcode() == Some(ROOM_IN_USE) {
        debug!(room = %room.id, name = %request.name, "room alias in use, searching");
        let existing = resolve_existing(admin, &request.name)?;
        stats.resolved += 1;
        existing
    } else {
        return Err(MigrationError::RoomCreationFailed {
            room_id: room.id.clone(),
            status: resp.status,
            body: resp.body.to_string(),
        }
        .into());
    };

    debug!(room = %room.id, target = %target, "room mapped");
    mapper.insert_room(&room.id, &target);
    Ok(())
}

pub fn migrate_rooms(
    rooms: impl IntoIterator<Item = Result<SourceRoom>>,
    admin: &dyn AdminApi,
    mapper: &mut IdentifierMapper,
) -> Result<RoomPhaseStats> {
    let mut stats = RoomPhaseStats::default();
    for room in rooms {
        migrate_room(&room?, admin, mapper, &mut stats)?;
    }
    info!(
        created = stats.created,
        resolved = stats.resolved,
        "room phase complete"
    );
    Ok(stats)
}
