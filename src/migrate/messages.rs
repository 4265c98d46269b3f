use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use tracing::{debug, info, warn};

use crate::error::MigrationError;
use crate::matrix::content::FileContent;
use crate::matrix::{self, AdminApi, ApiResponse, ImpersonationApi};
use crate::migrate::format::format_message;
use crate::migrate::mapper::{EventLedger, IdentifierMapper};
use crate::rocketchat::model::{SourceAttachment, SourceMessage};
use crate::rocketchat::paths::ExportPaths;
use crate::util::truncate_with_ellipsis;

const FORBIDDEN: &str = "M_FORBIDDEN";
const PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessagePhaseStats {
    pub sent: usize,
    pub replies: usize,
    pub attachments: usize,
    /// Sends that succeeded after the sender was joined to the room.
    pub recovered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Replays source messages in file order. Room and user mappings are only
/// read here; target event ids are collected to thread later replies.
pub struct MessageMigrator<'a> {
    admin: &'a dyn AdminApi,
    sender: &'a dyn ImpersonationApi,
    mapper: &'a IdentifierMapper,
    paths: &'a ExportPaths,
    hostname: &'a str,
    ledger: EventLedger,
    high_water_ms: Option<i64>,
    stats: MessagePhaseStats,
}

impl<'a> MessageMigrator<'a> {
    pub fn new(
        admin: &'a dyn AdminApi,
        sender: &'a dyn ImpersonationApi,
        mapper: &'a IdentifierMapper,
        paths: &'a ExportPaths,
        hostname: &'a str,
    ) -> Self {
        Self {
            admin,
            sender,
            mapper,
            paths,
            hostname,
            ledger: EventLedger::default(),
            high_water_ms: None,
            stats: MessagePhaseStats::default(),
        }
    }

    pub fn stats(&self) -> &MessagePhaseStats {
        &self.stats
    }

    pub fn into_stats(self) -> MessagePhaseStats {
        self.stats
    }

    fn sender_id(&self, msg: &SourceMessage) -> String {
        let username = msg
            .sender
            .id
            .as_deref()
            .and_then(|id| self.mapper.user(id))
            .unwrap_or(&msg.sender.username);
        matrix::user_id(username, self.hostname)
    }

    /// Enforce non-decreasing send order; aborts the run on regression.
    fn advance_clock(&mut self, msg: &SourceMessage) -> Result<i64> {
        let ts = msg
            .timestamp
            .epoch_millis()
            .ok_or_else(|| MigrationError::InvalidTimestamp {
                message_id: msg.id.clone(),
                raw: msg.timestamp.raw(),
            })?;
        if let Some(previous) = self.high_water_ms
            && ts < previous
        {
            return Err(MigrationError::MessagesOutOfOrder {
                message_id: msg.id.clone(),
                timestamp_ms: ts,
                previous_ms: previous,
            }
            .into());
        }
        self.high_water_ms = Some(ts);
        Ok(ts)
    }

    pub fn migrate(&mut self, msg: &SourceMessage) -> Result<()> {
        let mapper = self.mapper;
        let Some(room_id) = mapper.room(&msg.room_id) else {
            debug!(message = %msg.id, room = %msg.room_id, "not in a room");
            self.stats.skipped += 1;
            return Ok(());
        };
        let user_id = self.sender_id(msg);
        let ts = self.advance_clock(msg)?;

        match &msg.attachment {
            Some(attachment) => self.replay_attachment(msg, attachment, room_id, &user_id, ts),
            None => self.replay_text(msg, room_id, &user_id, ts),
        }
    }

    fn record_outcome(&mut self, msg: &SourceMessage, resp: &ApiResponse, user_id: &str) {
        if resp.is_success() {
            if let Some(event_id) = resp.str_field("event_id") {
                self.ledger.record(&msg.id, event_id);
            }
            self.stats.sent += 1;
        } else {
            warn!(
                message = %msg.id,
                sender = %user_id,
                status = resp.status,
                errcode = resp.errcode().unwrap_or_default(),
                "message send failed"
            );
            self.stats.failed += 1;
        }
    }

    // No join-and-resend here: a rejected file post is reported as failed.
    fn replay_attachment(
        &mut self,
        msg: &SourceMessage,
        attachment: &SourceAttachment,
        room_id: &str,
        user_id: &str,
        ts: i64,
    ) -> Result<()> {
        let path = self.paths.attachment(&attachment.id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                warn!(message = %msg.id, path = %path.display(), error = %err, "attachment unreadable");
                self.stats.failed += 1;
                return Ok(());
            }
        };
        let size = data.len() as u64;

        let upload =
            self.sender
                .upload_media(user_id, ts, &attachment.name, &attachment.mime_type, data)?;
        let Some(content_uri) = upload
            .is_success()
            .then(|| upload.str_field("content_uri"))
            .flatten()
        else {
            warn!(
                message = %msg.id,
                file = %attachment.name,
                status = upload.status,
                "media upload failed"
            );
            self.stats.failed += 1;
            return Ok(());
        };
        debug!(message = %msg.id, uri = %content_uri, "media uploaded");

        let content = FileContent::new(&attachment.name, content_uri, &attachment.mime_type, size);
        let resp = self
            .sender
            .send_message(room_id, user_id, ts, &serde_json::to_value(&content)?)?;
        if resp.is_success() {
            self.stats.attachments += 1;
        }
        self.record_outcome(msg, &resp, user_id);
        Ok(())
    }

    fn replay_text(
        &mut self,
        msg: &SourceMessage,
        room_id: &str,
        user_id: &str,
        ts: i64,
    ) -> Result<()> {
        let ancestor = msg
            .thread_parent_id
            .as_deref()
            .and_then(|parent| self.ledger.event(parent))
            .map(str::to_string);
        let content: Value = serde_json::to_value(format_message(&msg.body, ancestor.as_deref()))?;
        debug!(
            message = %msg.id,
            sender = %user_id,
            body = %truncate_with_ellipsis(&msg.body, PREVIEW_CHARS),
            "sending message"
        );

        let mut resp = self.sender.send_message(room_id, user_id, ts, &content)?;
        let mut retried = false;
        if resp.status == 403 && resp.errcode() == Some(FORBIDDEN) {
            debug!(message = %msg.id, sender = %user_id, room = %room_id, "sender not in room, joining");
            let join = self.admin.force_join(room_id, user_id)?;
            if !join.is_success() {
                warn!(
                    room = %room_id,
                    sender = %user_id,
                    status = join.status,
                    "forced join failed"
                );
            }
            resp = self.sender.send_message(room_id, user_id, ts, &content)?;
            retried = true;
        }

        if resp.is_success() {
            if ancestor.is_some() {
                self.stats.replies += 1;
            }
            if retried {
                self.stats.recovered += 1;
            }
        }
        self.record_outcome(msg, &resp, user_id);
        Ok(())
    }
}

pub fn migrate_messages(
    messages: impl IntoIterator<Item = Result<SourceMessage>>,
    migrator: &mut MessageMigrator<'_>,
) -> Result<()> {
    for msg in messages {
        migrator.migrate(&msg?)?;
    }
    let stats = migrator.stats();
    info!(
        sent = stats.sent,
        skipped = stats.skipped,
        failed = stats.failed,
        "message phase complete"
    );
    Ok(())
}
