use crate::{Data, EVENT_TARGET};
use crate::rejoin::{DiscordPlatform, MemberRef};
use poise::serenity_prelude::{
    self as serenity, ActivityData, Context, EventHandler, GuildId, Member, OnlineStatus, Ready,
    User,
};
use tracing::{info, warn};

/// Presence shown while the bot is online
pub const PRESENCE: &str = "Blacklisting User";

pub struct Handler {
    pub data: Data,
}

impl Handler {
    #[must_use]
    pub const fn new(data: Data) -> Self {
        Self { data }
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.tag();
        let shard_id = ctx.shard_id;
        info!("Logged in as {user_name}, shard {shard_id}");

        ctx.set_presence(Some(ActivityData::watching(PRESENCE)), OnlineStatus::Online);
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!("Cache ready! The bot is in {guild_count} guild(s)");
    }

    async fn guild_member_removal(
        &self,
        ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        info!(target: EVENT_TARGET, user_id = %user.id, guild_id = %guild_id, "guild_member_removal");
        let member = MemberRef::from_user(guild_id, &user);
        let platform = DiscordPlatform::new(&ctx);
        self.data.warden.on_member_leave(&platform, &member).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        info!(
            target: EVENT_TARGET,
            user_id = %new_member.user.id,
            guild_id = %new_member.guild_id,
            "guild_member_addition"
        );
        let member = MemberRef::from_member(&new_member);
        let platform = DiscordPlatform::new(&ctx);
        self.data.warden.on_member_join(&platform, &member).await;
    }
}
