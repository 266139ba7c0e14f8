//! Rejoin tracking for Rejoin Warden
//!
//! Counts how often each member leaves the guild, warns on the first leave,
//! and blacklists from the second one on.

mod audit;
mod discord;
mod enforcer;
mod error;
mod notifier;
mod platform;
pub mod policy;
mod router;
mod store;

pub use audit::{AuditSink, WebhookAudit, WebhookPayload};
pub use discord::DiscordPlatform;
pub use enforcer::{Enforcer, KICK_REASON, KickOutcome, RoleGrant, RoleRevocation};
pub use error::{WardenError, WardenResult};
pub use notifier::{DirectNotice, NoticeField, NoticeKind, Notifier};
pub use platform::{MemberRef, Platform, RoleRef};
pub use policy::{BLACKLIST_THRESHOLD, Escalation, RejoinState};
pub use router::{CommandReply, JoinOutcome, LeaveOutcome, Warden};
pub use store::{CounterBackend, CounterSnapshot, CounterStore, JsonFileBackend};

#[cfg(test)]
pub use audit::MockAuditSink;
#[cfg(test)]
pub use platform::MockPlatform;
#[cfg(test)]
pub use store::MockCounterBackend;
