//! Member event routing
//!
//! Ties the counter store, escalation policy, notifier and enforcer together
//! for the three events the bot reacts to: a member leaving, a member joining
//! and the `unblacklist` command.

use crate::rejoin::policy::{self, Escalation, RejoinState};
use crate::rejoin::{
    CounterStore, Enforcer, KickOutcome, MemberRef, NoticeKind, Notifier, Platform, RoleGrant,
    RoleRevocation,
};
use poise::serenity_prelude::{GuildId, UserId};
use std::fmt::{Display, Formatter};
use tracing::{debug, error, info};

/// What happened while handling a leave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Stored count after this leave
    pub count: u64,
    pub escalation: Escalation,
    pub dm_delivered: bool,
    pub role: Option<RoleGrant>,
    pub kick: Option<KickOutcome>,
}

/// What happened while handling a join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Stored count, unchanged by the join
    pub count: u64,
    pub escalation: Escalation,
    pub dm_delivered: bool,
    pub role: Option<RoleGrant>,
    pub kick: Option<KickOutcome>,
}

/// Replies sent back for the `unblacklist` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    PermissionDenied,
    MissingUserId,
    UserNotFound,
    RoleNotFound,
    RoleRemovalFailed,
    Unblacklisted(UserId),
}

impl Display for CommandReply {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "You do not have permission to use this command."),
            Self::MissingUserId => write!(f, "Please provide the user ID to unblacklist."),
            Self::UserNotFound => write!(f, "User not found in the server."),
            Self::RoleNotFound => write!(f, "Role not found."),
            Self::RoleRemovalFailed => write!(f, "Failed to remove role."),
            Self::Unblacklisted(user_id) => write!(f, "User <@{user_id}> has been unblacklisted."),
        }
    }
}

/// Accepts a raw ID or a user mention
fn parse_user_id(argument: &str) -> Option<UserId> {
    let trimmed = argument.trim();
    let raw = trimmed
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map_or(trimmed, |inner| inner.trim_start_matches('!'));

    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId::new)
}

/// Rejoin tracker
pub struct Warden {
    store: CounterStore,
    notifier: Notifier,
    enforcer: Enforcer,
}

impl Warden {
    pub fn new(store: CounterStore, notifier: Notifier, enforcer: Enforcer) -> Self {
        Self {
            store,
            notifier,
            enforcer,
        }
    }

    #[must_use]
    pub fn store(&self) -> &CounterStore {
        &self.store
    }

    /// Current escalation state of a user
    #[must_use]
    pub fn state_of(&self, user_id: UserId) -> RejoinState {
        RejoinState::from_count(self.store.get(&user_id.get().to_string()))
    }

    /// Handle a member leaving the guild
    ///
    /// Returns `None` for bot accounts, which are not tracked.
    pub async fn on_member_leave(
        &self,
        platform: &dyn Platform,
        member: &MemberRef,
    ) -> Option<LeaveOutcome> {
        if member.bot {
            debug!("Ignoring bot {} leaving", member.tag);
            return None;
        }

        let count = self.store.increment(&member.counter_key()).await;
        let escalation = policy::on_leave(count - 1);
        info!(
            target: crate::EVENT_TARGET,
            user_id = %member.user_id,
            guild_id = %member.guild_id,
            count,
            escalation = ?escalation,
            "Member left"
        );

        let mut outcome = LeaveOutcome {
            count,
            escalation,
            dm_delivered: false,
            role: None,
            kick: None,
        };

        match escalation {
            Escalation::None => {}
            Escalation::Warn => {
                outcome.dm_delivered = self
                    .notifier
                    .direct_message(platform, member, NoticeKind::Warning)
                    .await;
            }
            Escalation::Blacklist => {
                outcome.dm_delivered = self
                    .notifier
                    .direct_message(platform, member, NoticeKind::Blacklisted)
                    .await;
                outcome.role = Some(self.enforcer.apply_role(platform, &self.notifier, member).await);
                outcome.kick = Some(self.enforcer.apply_kick(platform, member).await);
            }
        }

        self.notifier.audit_leave(member.user_id, count);
        Some(outcome)
    }

    /// Handle a member joining the guild
    ///
    /// Blacklisted members get the role back, the blacklist notice again, and
    /// are kicked when kicking is enabled. The stored count is never changed.
    pub async fn on_member_join(
        &self,
        platform: &dyn Platform,
        member: &MemberRef,
    ) -> Option<JoinOutcome> {
        if member.bot {
            debug!("Ignoring bot {} joining", member.tag);
            return None;
        }

        let count = self.store.get(&member.counter_key());
        let escalation = policy::on_join(count);
        let mut outcome = JoinOutcome {
            count,
            escalation,
            dm_delivered: false,
            role: None,
            kick: None,
        };

        if escalation == Escalation::Blacklist {
            info!(
                target: crate::EVENT_TARGET,
                user_id = %member.user_id,
                guild_id = %member.guild_id,
                count,
                "Blacklisted member rejoined"
            );
            outcome.role = Some(self.enforcer.apply_role(platform, &self.notifier, member).await);
            outcome.dm_delivered = self
                .notifier
                .direct_message(platform, member, NoticeKind::Blacklisted)
                .await;
            outcome.kick = Some(self.enforcer.apply_kick(platform, member).await);
        }

        Some(outcome)
    }

    /// Handle `unblacklist <userId>` from `invoker`
    ///
    /// Only the first word of `argument` is used.
    ///
    /// Returns the replies to send, in order. Only the final
    /// [`CommandReply::Unblacklisted`] path changes any state.
    pub async fn unblacklist(
        &self,
        platform: &dyn Platform,
        guild_id: GuildId,
        invoker: UserId,
        argument: Option<&str>,
    ) -> Vec<CommandReply> {
        let is_admin = match platform.is_administrator(guild_id, invoker).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                error!("Failed to resolve permissions for {invoker}: {e}");
                false
            }
        };
        if !is_admin {
            return vec![CommandReply::PermissionDenied];
        }

        let Some(argument) = argument.and_then(|arg| arg.split_whitespace().next()) else {
            return vec![CommandReply::MissingUserId];
        };

        let Some(user_id) = parse_user_id(argument) else {
            return vec![CommandReply::UserNotFound];
        };

        match platform.find_member(guild_id, user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return vec![CommandReply::UserNotFound],
            Err(e) => {
                error!("Failed to look up member {user_id}: {e}");
                return vec![CommandReply::UserNotFound];
            }
        }

        let mut replies = Vec::new();
        match self.enforcer.revoke_role(platform, guild_id, user_id).await {
            RoleRevocation::NotConfigured | RoleRevocation::Revoked => {}
            RoleRevocation::RoleMissing => replies.push(CommandReply::RoleNotFound),
            RoleRevocation::Failed => replies.push(CommandReply::RoleRemovalFailed),
        }

        self.store.reset(&user_id.get().to_string()).await;
        info!(
            target: crate::EVENT_TARGET,
            user_id = %user_id,
            invoker = %invoker,
            "User unblacklisted"
        );

        replies.push(CommandReply::Unblacklisted(user_id));
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rejoin::{
        AuditSink, CounterSnapshot, MockCounterBackend, MockPlatform, RoleRef, WardenError,
    };
    use poise::serenity_prelude::RoleId;
    use std::sync::{Arc, Mutex};

    const GUILD: u64 = 1;
    const USER: u64 = 42;
    const ADMIN: u64 = 7;
    const ROLE: u64 = 900;

    #[derive(Default)]
    struct RecordingAudit(Mutex<Vec<String>>);

    impl RecordingAudit {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl AuditSink for RecordingAudit {
        fn record(&self, line: String) {
            self.0.lock().unwrap().push(line);
        }
    }

    async fn store_with(initial: CounterSnapshot) -> CounterStore {
        let mut backend = MockCounterBackend::new();
        backend
            .expect_load()
            .returning(move || Ok(initial.clone()));
        backend.expect_save().returning(|_| Ok(()));
        CounterStore::load(Arc::new(backend)).await.unwrap()
    }

    async fn warden(
        initial: &[(u64, u64)],
        kick_enabled: bool,
    ) -> (Warden, Arc<RecordingAudit>) {
        let snapshot = initial
            .iter()
            .map(|(user, count)| (user.to_string(), *count))
            .collect();
        let audit = Arc::new(RecordingAudit::default());
        let warden = Warden::new(
            store_with(snapshot).await,
            Notifier::new(audit.clone(), None),
            Enforcer::new(Some(RoleId::new(ROLE)), kick_enabled),
        );
        (warden, audit)
    }

    fn member() -> MemberRef {
        MemberRef {
            guild_id: GuildId::new(GUILD),
            user_id: UserId::new(USER),
            tag: "leaver#0001".to_string(),
            avatar_url: String::new(),
            bot: false,
        }
    }

    fn role() -> RoleRef {
        RoleRef {
            id: RoleId::new(ROLE),
            name: "Blacklisted".to_string(),
        }
    }

    /// Platform where every call succeeds, expecting `blacklists` full enforcement rounds
    fn enforcing_platform(blacklists: usize, kick_enabled: bool) -> MockPlatform {
        let mut platform = MockPlatform::new();
        platform
            .expect_send_direct_message()
            .withf(|_, notice| notice.kind == NoticeKind::Blacklisted)
            .times(blacklists)
            .returning(|_, _| Ok(()));
        platform
            .expect_find_role()
            .times(blacklists)
            .returning(|_, _| Ok(Some(role())));
        platform
            .expect_add_role()
            .times(blacklists)
            .returning(|_, _, _| Ok(()));
        platform
            .expect_kick()
            .times(if kick_enabled { blacklists } else { 0 })
            .returning(|_, _, _| Ok(()));
        platform
    }

    #[tokio::test]
    async fn test_first_leave_warns() {
        let (warden, audit) = warden(&[], true).await;
        let mut platform = MockPlatform::new();
        platform
            .expect_send_direct_message()
            .withf(|_, notice| notice.kind == NoticeKind::Warning)
            .times(1)
            .returning(|_, _| Ok(()));
        platform.expect_add_role().never();
        platform.expect_kick().never();

        let outcome = warden.on_member_leave(&platform, &member()).await.unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.escalation, Escalation::Warn);
        assert!(outcome.dm_delivered);
        assert_eq!(outcome.role, None);
        assert_eq!(outcome.kick, None);
        assert_eq!(warden.state_of(UserId::new(USER)), RejoinState::Warned);
        assert_eq!(
            audit.lines(),
            vec!["<@42> has left the server and has been given 1 warning(s).".to_string()]
        );
    }

    #[tokio::test]
    async fn test_second_leave_blacklists() {
        let (warden, audit) = warden(&[(USER, 1)], true).await;
        let platform = enforcing_platform(1, true);

        let outcome = warden.on_member_leave(&platform, &member()).await.unwrap();
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.escalation, Escalation::Blacklist);
        assert_eq!(outcome.role, Some(RoleGrant::Granted(role())));
        assert_eq!(outcome.kick, Some(KickOutcome::Kicked));
        assert_eq!(warden.state_of(UserId::new(USER)), RejoinState::Blacklisted);

        let lines = audit.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "<@42> has been granted the role <@&900>.");
        assert_eq!(
            lines[1],
            "<@42> has left the server and has been given 2 warning(s)."
        );
    }

    #[tokio::test]
    async fn test_failed_dm_does_not_block_enforcement() {
        let (warden, audit) = warden(&[(USER, 3)], true).await;
        let mut platform = MockPlatform::new();
        platform
            .expect_send_direct_message()
            .returning(|_, _| Err(WardenError::NotFound("dm channel".to_string())));
        platform.expect_find_role().returning(|_, _| Ok(None));
        platform.expect_kick().times(1).returning(|_, _, _| Ok(()));

        let outcome = warden.on_member_leave(&platform, &member()).await.unwrap();
        assert_eq!(outcome.count, 4);
        assert!(!outcome.dm_delivered);
        assert_eq!(outcome.role, Some(RoleGrant::RoleMissing));
        assert_eq!(outcome.kick, Some(KickOutcome::Kicked));
        assert_eq!(
            audit.lines(),
            vec!["<@42> has left the server and has been given 4 warning(s).".to_string()]
        );
    }

    #[tokio::test]
    async fn test_blacklisted_rejoin_is_enforced_again() {
        let (warden, audit) = warden(&[(USER, 2)], true).await;
        let platform = enforcing_platform(2, true);

        for _ in 0..2 {
            let outcome = warden.on_member_join(&platform, &member()).await.unwrap();
            assert_eq!(outcome.count, 2);
            assert_eq!(outcome.escalation, Escalation::Blacklist);
            assert!(outcome.dm_delivered);
            assert_eq!(outcome.role, Some(RoleGrant::Granted(role())));
            assert_eq!(outcome.kick, Some(KickOutcome::Kicked));
        }

        assert_eq!(warden.store().get(&USER.to_string()), 2);
        assert_eq!(
            audit.lines(),
            vec![
                "<@42> has been granted the role <@&900>.".to_string(),
                "<@42> has been granted the role <@&900>.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_rejoin_without_kick() {
        let (warden, _audit) = warden(&[(USER, 5)], false).await;
        let platform = enforcing_platform(1, false);

        let outcome = warden.on_member_join(&platform, &member()).await.unwrap();
        assert_eq!(outcome.kick, Some(KickOutcome::Disabled));
    }

    #[tokio::test]
    async fn test_warned_member_join_is_ignored() {
        let (warden, audit) = warden(&[(USER, 1)], true).await;
        let platform = MockPlatform::new();

        let outcome = warden.on_member_join(&platform, &member()).await.unwrap();
        assert_eq!(outcome.escalation, Escalation::None);
        assert_eq!(outcome.role, None);
        assert_eq!(outcome.kick, None);
        assert!(audit.lines().is_empty());
        assert_eq!(warden.store().get(&USER.to_string()), 1);
    }

    #[tokio::test]
    async fn test_bots_are_not_tracked() {
        let (warden, audit) = warden(&[], true).await;
        let platform = MockPlatform::new();
        let bot = MemberRef {
            bot: true,
            ..member()
        };

        assert!(warden.on_member_leave(&platform, &bot).await.is_none());
        assert!(warden.on_member_join(&platform, &bot).await.is_none());
        assert_eq!(warden.store().get(&USER.to_string()), 0);
        assert!(audit.lines().is_empty());
    }

    fn admin_platform(is_admin: bool) -> MockPlatform {
        let mut platform = MockPlatform::new();
        platform
            .expect_is_administrator()
            .withf(|_, user| *user == UserId::new(ADMIN))
            .returning(move |_, _| Ok(is_admin));
        platform
    }

    #[tokio::test]
    async fn test_unblacklist_resets_counter() {
        let (warden, _audit) = warden(&[(USER, 2)], true).await;
        let mut platform = admin_platform(true);
        platform
            .expect_find_member()
            .returning(|_, _| Ok(Some(member())));
        platform
            .expect_find_role()
            .returning(|_, _| Ok(Some(role())));
        platform
            .expect_remove_role()
            .withf(|_, user, role| *user == UserId::new(USER) && *role == RoleId::new(ROLE))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let replies = warden
            .unblacklist(
                &platform,
                GuildId::new(GUILD),
                UserId::new(ADMIN),
                Some("42"),
            )
            .await;
        assert_eq!(replies, vec![CommandReply::Unblacklisted(UserId::new(USER))]);
        assert_eq!(replies[0].to_string(), "User <@42> has been unblacklisted.");
        assert_eq!(warden.state_of(UserId::new(USER)), RejoinState::Clean);
        assert!(!warden.store().snapshot().contains_key("42"));

        // The next leave starts over as a first warning
        platform
            .expect_send_direct_message()
            .withf(|_, notice| notice.kind == NoticeKind::Warning)
            .times(1)
            .returning(|_, _| Ok(()));
        let outcome = warden.on_member_leave(&platform, &member()).await.unwrap();
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.escalation, Escalation::Warn);
    }

    #[tokio::test]
    async fn test_unblacklist_requires_administrator() {
        let (warden, audit) = warden(&[(USER, 2)], true).await;
        let mut platform = admin_platform(false);
        platform.expect_find_member().never();
        platform.expect_remove_role().never();

        let replies = warden
            .unblacklist(
                &platform,
                GuildId::new(GUILD),
                UserId::new(ADMIN),
                Some("42"),
            )
            .await;
        assert_eq!(replies, vec![CommandReply::PermissionDenied]);
        assert_eq!(
            replies[0].to_string(),
            "You do not have permission to use this command."
        );
        assert_eq!(warden.store().get("42"), 2);
        assert!(audit.lines().is_empty());
    }

    #[tokio::test]
    async fn test_unblacklist_permission_lookup_failure_denies() {
        let (warden, _audit) = warden(&[(USER, 2)], true).await;
        let mut platform = MockPlatform::new();
        platform
            .expect_is_administrator()
            .returning(|_, _| Err(WardenError::NotFound("guild".to_string())));

        let replies = warden
            .unblacklist(&platform, GuildId::new(GUILD), UserId::new(ADMIN), Some("42"))
            .await;
        assert_eq!(replies, vec![CommandReply::PermissionDenied]);
        assert_eq!(warden.store().get("42"), 2);
    }

    #[tokio::test]
    async fn test_unblacklist_missing_argument() {
        let (warden, _audit) = warden(&[(USER, 2)], true).await;
        let platform = admin_platform(true);

        for argument in [None, Some(""), Some("   ")] {
            let replies = warden
                .unblacklist(&platform, GuildId::new(GUILD), UserId::new(ADMIN), argument)
                .await;
            assert_eq!(replies, vec![CommandReply::MissingUserId]);
        }
        assert_eq!(warden.store().get("42"), 2);
    }

    #[tokio::test]
    async fn test_unblacklist_unknown_user() {
        let (warden, _audit) = warden(&[(USER, 2)], true).await;
        let mut platform = admin_platform(true);
        platform.expect_find_member().returning(|_, _| Ok(None));
        platform.expect_remove_role().never();

        for argument in ["42", "not-an-id", "0"] {
            let replies = warden
                .unblacklist(
                    &platform,
                    GuildId::new(GUILD),
                    UserId::new(ADMIN),
                    Some(argument),
                )
                .await;
            assert_eq!(replies, vec![CommandReply::UserNotFound]);
        }
        assert_eq!(warden.store().get("42"), 2);
    }

    #[tokio::test]
    async fn test_unblacklist_reports_role_problems_and_still_resets() {
        let (warden, _audit) = warden(&[(USER, 2)], true).await;
        let mut platform = admin_platform(true);
        platform
            .expect_find_member()
            .returning(|_, _| Ok(Some(member())));
        platform
            .expect_find_role()
            .returning(|_, _| Ok(Some(role())));
        platform
            .expect_remove_role()
            .returning(|_, _, _| Err(WardenError::NotFound("permissions".to_string())));

        let replies = warden
            .unblacklist(
                &platform,
                GuildId::new(GUILD),
                UserId::new(ADMIN),
                Some("<@!42>"),
            )
            .await;
        assert_eq!(
            replies,
            vec![
                CommandReply::RoleRemovalFailed,
                CommandReply::Unblacklisted(UserId::new(USER)),
            ]
        );
        assert_eq!(warden.store().get("42"), 0);
    }

    #[tokio::test]
    async fn test_unblacklist_reports_missing_role_and_still_resets() {
        let (warden, _audit) = warden(&[(USER, 2)], true).await;
        let mut platform = admin_platform(true);
        platform
            .expect_find_member()
            .returning(|_, _| Ok(Some(member())));
        platform.expect_find_role().times(1).returning(|_, _| Ok(None));
        platform.expect_remove_role().never();

        let replies = warden
            .unblacklist(
                &platform,
                GuildId::new(GUILD),
                UserId::new(ADMIN),
                Some("42 extra"),
            )
            .await;
        assert_eq!(
            replies,
            vec![
                CommandReply::RoleNotFound,
                CommandReply::Unblacklisted(UserId::new(USER)),
            ]
        );
        assert_eq!(replies[0].to_string(), "Role not found.");
        assert_eq!(warden.store().get("42"), 0);
    }

    #[tokio::test]
    async fn test_unblacklist_without_role_configured() {
        let warden = Warden::new(
            store_with([(USER.to_string(), 3)].into_iter().collect()).await,
            Notifier::new(Arc::new(RecordingAudit::default()), None),
            Enforcer::new(None, true),
        );
        let mut platform = admin_platform(true);
        platform
            .expect_find_member()
            .returning(|_, _| Ok(Some(member())));
        platform.expect_find_role().never();
        platform.expect_remove_role().never();

        let replies = warden
            .unblacklist(&platform, GuildId::new(GUILD), UserId::new(ADMIN), Some("42"))
            .await;
        assert_eq!(replies, vec![CommandReply::Unblacklisted(UserId::new(USER))]);
        assert_eq!(warden.store().get("42"), 0);
    }

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("42"), Some(UserId::new(42)));
        assert_eq!(parse_user_id(" 42 "), Some(UserId::new(42)));
        assert_eq!(parse_user_id("<@42>"), Some(UserId::new(42)));
        assert_eq!(parse_user_id("<@!42>"), Some(UserId::new(42)));
        assert_eq!(parse_user_id("0"), None);
        assert_eq!(parse_user_id("-1"), None);
        assert_eq!(parse_user_id("someone"), None);
    }
}
