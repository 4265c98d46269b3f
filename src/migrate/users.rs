use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::matrix::{self, AdminApi};
use crate::migrate::mapper::IdentifierMapper;
use crate::rocketchat::model::SourceUser;

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPhaseStats {
    pub provisioned: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Create-or-update a non-admin account per source user. A rejected call is
/// logged and leaves the user unmapped; it never stops the run.
pub fn migrate_users(
    users: impl IntoIterator<Item = Result<SourceUser>>,
    admin: &dyn AdminApi,
    hostname: &str,
    mapper: &mut IdentifierMapper,
) -> Result<UserPhaseStats> {
    let mut stats = UserPhaseStats::default();
    for user in users {
        let user = user?;
        let Some(username) = user.username.as_deref().filter(|u| !u.trim().is_empty()) else {
            debug!(user = %user.id, "user has no username, skipping");
            stats.skipped += 1;
            continue;
        };

        let user_id = matrix::user_id(username, hostname);
        let resp = admin.upsert_user(&user_id)?;
        if resp.is_success() {
            debug!(user = %user.id, target = %user_id, "user provisioned");
            mapper.insert_user(&user.id, username);
            stats.provisioned += 1;
        } else {
            warn!(
                user = %user.id,
                target = %user_id,
                status = resp.status,
                errcode = resp.errcode().unwrap_or_default(),
                "user provisioning failed"
            );
            stats.failed += 1;
        }
    }
    info!(
        provisioned = stats.provisioned,
        failed = stats.failed,
        "user phase complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::migrate_users;
    use crate::migrate::fake::{Call, Endpoint, FakeServer};
    use crate::migrate::mapper::IdentifierMapper;
    use crate::rocketchat::model::SourceUser;
    use serde_json::json;

    fn user(id: &str, username: Option<&str>) -> anyhow::Result<SourceUser> {
        Ok(SourceUser {
            id: id.to_string(),
            username: username.map(str::to_string),
        })
    }

    #[test]
    fn provisions_each_user_under_the_target_hostname() {
        let server = FakeServer::new();
        let mut mapper = IdentifierMapper::default();

        let stats = migrate_users(
            vec![user("u1", Some("alice")), user("u2", Some("bob"))],
            &server,
            "chat.example.org",
            &mut mapper,
        )
        .expect("users");

        assert_eq!(stats.provisioned, 2);
        assert_eq!(mapper.user("u2"), Some("bob"));
        assert_eq!(
            server.calls(),
            vec![
                Call::UpsertUser("@alice:chat.example.org".to_string()),
                Call::UpsertUser("@bob:chat.example.org".to_string()),
            ]
        );
    }

    #[test]
    fn rejected_provisioning_is_logged_and_unmapped() {
        let server = FakeServer::new();
        server.script(Endpoint::UpsertUser, 400, json!({"errcode": "M_INVALID_USERNAME"}));
        let mut mapper = IdentifierMapper::default();

        let stats = migrate_users(
            vec![user("u1", Some("Bad Name")), user("u2", Some("bob"))],
            &server,
            "localhost",
            &mut mapper,
        )
        .expect("failures are not fatal");

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.provisioned, 1);
        assert_eq!(mapper.user("u1"), None);
        assert_eq!(mapper.user("u2"), Some("bob"));
    }

    #[test]
    fn users_without_username_are_skipped() {
        let server = FakeServer::new();
        let mut mapper = IdentifierMapper::default();

        let stats = migrate_users(vec![user("u1", None)], &server, "localhost", &mut mapper)
            .expect("users");
        assert_eq!(stats.skipped, 1);
        assert!(server.calls().is_empty());
    }
}
