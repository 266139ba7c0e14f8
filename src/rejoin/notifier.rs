//! Member notifications
//!
//! Builds the warning and blacklist direct messages, sends them through the
//! platform, and formats the audit lines mirrored to the webhook.

use crate::rejoin::{AuditSink, MemberRef, Platform, RoleRef};
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use tracing::{error, info};

const WARNING_COLOUR: u32 = 0xFF_A5_00;
const BLACKLIST_COLOUR: u32 = 0xFF_00_00;

/// Which direct message to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Warning,
    Blacklisted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
}

/// A direct message, independent of how the platform renders it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectNotice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
    pub fields: Vec<NoticeField>,
    pub footer: String,
    pub colour: u32,
}

/// Sends direct messages and audit lines
#[derive(Clone)]
pub struct Notifier {
    audit: Arc<dyn AuditSink>,
    invite_url: Option<String>,
}

impl Notifier {
    pub fn new(audit: Arc<dyn AuditSink>, invite_url: Option<String>) -> Self {
        Self { audit, invite_url }
    }

    /// Build the direct message for `kind`
    #[must_use]
    pub fn notice(&self, kind: NoticeKind) -> DirectNotice {
        match kind {
            NoticeKind::Warning => self.warning_notice(),
            NoticeKind::Blacklisted => self.blacklist_notice(),
        }
    }

    fn invite_field(&self, name: &str) -> Option<NoticeField> {
        self.invite_url.as_ref().map(|url| NoticeField {
            name: name.to_string(),
            value: format!("**[Join the Server]({url})**"),
        })
    }

    fn warning_notice(&self) -> DirectNotice {
        DirectNotice {
            kind: NoticeKind::Warning,
            title: "Warning!".to_string(),
            description: "It seems you've left the server. If you rejoin and then leave the \
                          server again, you will be blacklisted and will not be able to rejoin \
                          without submitting an appeal."
                .to_string(),
            fields: self.invite_field("Server Link").into_iter().collect(),
            footer: "Please consider this carefully before leaving again.".to_string(),
            colour: WARNING_COLOUR,
        }
    }

    fn blacklist_notice(&self) -> DirectNotice {
        let mut fields: Vec<NoticeField> = self
            .invite_field("Click the Link to Join Server")
            .into_iter()
            .collect();
        fields.extend([
            NoticeField {
                name: "Head Towards the Appeal Channel".to_string(),
                value: "Open a ticket for your appeal and give a valid reason why you left the \
                        server, so we can understand your situation."
                    .to_string(),
            },
            NoticeField {
                name: "Submit the Ticket".to_string(),
                value: "After completing the form, submit it for review.".to_string(),
            },
            NoticeField {
                name: "Wait for a Response".to_string(),
                value: "Our moderation team will review your appeal and respond as soon as \
                        possible. This may take some time, so please be patient."
                    .to_string(),
            },
        ]);

        DirectNotice {
            kind: NoticeKind::Blacklisted,
            title: "You Have Been Blacklisted".to_string(),
            description: "Due to your recent actions, you have been blacklisted from rejoining \
                          the server. To regain access, please follow these steps to submit an \
                          appeal:"
                .to_string(),
            fields,
            footer: "Thank you for your cooperation.".to_string(),
            colour: BLACKLIST_COLOUR,
        }
    }

    /// Send a direct message to a member
    ///
    /// Delivery failures (closed DMs, no shared guild) are logged and reported
    /// as `false`; they never stop the caller.
    pub async fn direct_message(
        &self,
        platform: &dyn Platform,
        member: &MemberRef,
        kind: NoticeKind,
    ) -> bool {
        let notice = self.notice(kind);
        match platform.send_direct_message(member, &notice).await {
            Ok(()) => {
                info!("Sent {kind:?} notice to {}", member.tag);
                true
            }
            Err(e) => {
                error!("Failed to send {kind:?} notice to {}: {e}", member.tag);
                false
            }
        }
    }

    /// Audit a leave and the resulting warning count
    pub fn audit_leave(&self, user_id: UserId, count: u64) {
        self.audit.record(leave_line(user_id, count));
    }

    /// Audit a blacklist role grant
    pub fn audit_role_granted(&self, user_id: UserId, role: &RoleRef) {
        self.audit.record(role_granted_line(user_id, role));
    }
}

#[must_use]
pub fn leave_line(user_id: UserId, count: u64) -> String {
    format!("<@{user_id}> has left the server and has been given {count} warning(s).")
}

#[must_use]
pub fn role_granted_line(user_id: UserId, role: &RoleRef) -> String {
    format!("<@{user_id}> has been granted the role <@&{}>.", role.id)
}
