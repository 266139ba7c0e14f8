//! Platform capabilities
//!
//! The narrow set of chat-platform operations the rejoin tracker relies on.
//! Production code uses [`crate::rejoin::DiscordPlatform`]; tests use the
//! generated `MockPlatform`.

use crate::rejoin::{DirectNotice, WardenResult};
use poise::serenity_prelude::{GuildId, Member, RoleId, User, UserId};

/// A guild member as seen by the rejoin tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub guild_id: GuildId,
    pub user_id: UserId,
    /// Display tag used in logs
    pub tag: String,
    pub avatar_url: String,
    pub bot: bool,
}

impl MemberRef {
    #[must_use]
    pub fn from_user(guild_id: GuildId, user: &User) -> Self {
        Self {
            guild_id,
            user_id: user.id,
            tag: user.tag(),
            avatar_url: user.face(),
            bot: user.bot,
        }
    }

    #[must_use]
    pub fn from_member(member: &Member) -> Self {
        Self::from_user(member.guild_id, &member.user)
    }

    /// Key used for this member in the counter store
    #[must_use]
    pub fn counter_key(&self) -> String {
        self.user_id.get().to_string()
    }
}

/// A guild role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
}

/// Operations the rejoin tracker performs against the chat platform
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Send a direct message to a member
    async fn send_direct_message(
        &self,
        member: &MemberRef,
        notice: &DirectNotice,
    ) -> WardenResult<()>;

    /// Look up a role in a guild's role set
    async fn find_role(&self, guild_id: GuildId, role_id: RoleId) -> WardenResult<Option<RoleRef>>;

    async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId)
    -> WardenResult<()>;

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> WardenResult<()>;

    /// Remove a member from a guild
    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> WardenResult<()>;

    /// Look up a current member of a guild
    async fn find_member(&self, guild_id: GuildId, user_id: UserId)
    -> WardenResult<Option<MemberRef>>;

    /// Whether a member holds the administrator permission in a guild
    async fn is_administrator(&self, guild_id: GuildId, user_id: UserId) -> WardenResult<bool>;
}
