//! Replay pipeline: rooms, then users, then messages, strictly in that order.

pub mod format;
pub mod mapper;
pub mod messages;
pub mod rooms;
pub mod users;

#[cfg(test)]
pub mod fake;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::matrix::{AdminApi, ImpersonationApi};
use crate::rocketchat::export;
use crate::rocketchat::model::{SourceMessage, SourceRoom, SourceUser};
use crate::rocketchat::paths::ExportPaths;
use mapper::IdentifierMapper;
use messages::{MessageMigrator, MessagePhaseStats};
use rooms::RoomPhaseStats;
use users::UserPhaseStats;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationSummary {
    pub rooms: RoomPhaseStats,
    pub users: UserPhaseStats,
    pub messages: MessagePhaseStats,
}

pub fn run_pipeline(
    paths: &ExportPaths,
    hostname: &str,
    admin: &dyn AdminApi,
    sender: &dyn ImpersonationApi,
) -> Result<MigrationSummary> {
    let mut mapper = IdentifierMapper::default();

    let rooms = rooms::migrate_rooms(
        export::open::<SourceRoom>(&paths.rooms_file)?,
        admin,
        &mut mapper,
    )?;
    let users = users::migrate_users(
        export::open::<SourceUser>(&paths.users_file)?,
        admin,
        hostname,
        &mut mapper,
    )?;
    info!(
        rooms = mapper.room_count(),
        users = mapper.user_count(),
        "identifier mapping complete"
    );

    let mut migrator = MessageMigrator::new(admin, sender, &mapper, paths, hostname);
    messages::migrate_messages(
        export::open::<SourceMessage>(&paths.messages_file)?,
        &mut migrator,
    )?;

    Ok(MigrationSummary {
        rooms,
        users,
        messages: migrator.into_stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::run_pipeline;
    use crate::migrate::fake::{Call, FakeServer};
    use crate::rocketchat::paths::resolve_paths;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn phases_run_in_order_over_export_files() {
        let tmp = tempdir().expect("tempdir");
        fs::write(
            tmp.path().join("rocketchat_room.json"),
            "{\"_id\":\"GENERAL\",\"t\":\"c\",\"name\":\"general\"}\n",
        )
        .expect("write rooms");
        fs::write(
            tmp.path().join("users.json"),
            "{\"_id\":\"u1\",\"username\":\"alice\"}\n",
        )
        .expect("write users");
        fs::write(
            tmp.path().join("rocketchat_message.json"),
            concat!(
                "{\"_id\":\"m1\",\"rid\":\"GENERAL\",\"msg\":\"hi\",\"ts\":{\"$date\":\"2021-03-04T10:20:30Z\"},\"u\":{\"_id\":\"u1\",\"username\":\"alice\"}}\n",
                "{\"_id\":\"m2\",\"rid\":\"HIDDEN\",\"msg\":\"psst\",\"ts\":{\"$date\":\"2021-03-04T10:20:31Z\"},\"u\":{\"_id\":\"u1\",\"username\":\"alice\"}}\n",
            ),
        )
        .expect("write messages");

        let server = FakeServer::new();
        let paths = resolve_paths(tmp.path());
        let summary = run_pipeline(&paths, "localhost", &server, &server).expect("pipeline");

        assert_eq!(summary.rooms.created, 1);
        assert_eq!(summary.users.provisioned, 1);
        assert_eq!(summary.messages.sent, 1);
        assert_eq!(summary.messages.skipped, 1);

        let calls = server.calls();
        assert!(matches!(calls[0], Call::CreateRoom(_)));
        assert!(matches!(calls[1], Call::UpsertUser(_)));
        assert!(matches!(calls[2], Call::SendMessage { .. }));
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn missing_room_export_fails_before_any_call() {
        let tmp = tempdir().expect("tempdir");
        let server = FakeServer::new();
        let paths = resolve_paths(tmp.path());

        let err = run_pipeline(&paths, "localhost", &server, &server).expect_err("no export");
        assert!(format!("{err:#}").contains("rocketchat_room.json"));
        assert!(server.calls().is_empty());
    }
}
