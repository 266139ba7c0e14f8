//! Serenity-backed implementation of [`Platform`]

use crate::rejoin::{DirectNotice, MemberRef, Platform, RoleRef, WardenResult};
use poise::serenity_prelude::{
    self as serenity, Cache, CreateEmbed, CreateEmbedFooter, CreateMessage, GuildId, Http,
    Permissions, RoleId, UserId,
};
use std::sync::Arc;

/// Audit log reason attached to role changes
const ROLE_REASON: &str = "Rejoin blacklist";

/// Platform adapter over a serenity HTTP client and cache
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordPlatform {
    #[must_use]
    pub fn new(ctx: &serenity::Context) -> Self {
        Self {
            http: Arc::clone(&ctx.http),
            cache: Arc::clone(&ctx.cache),
        }
    }

    fn http(&self) -> &Http {
        &self.http
    }
}

fn render(member: &MemberRef, notice: &DirectNotice) -> CreateEmbed {
    notice.fields.iter().fold(
        CreateEmbed::new()
            .title(&notice.title)
            .description(&notice.description)
            .colour(notice.colour)
            .footer(CreateEmbedFooter::new(&notice.footer))
            .thumbnail(&member.avatar_url),
        |embed, field| embed.field(&field.name, &field.value, false),
    )
}

fn is_not_found(error: &serenity::Error) -> bool {
    matches!(
        error,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404
    )
}

#[async_trait::async_trait]
impl Platform for DiscordPlatform {
    async fn send_direct_message(
        &self,
        member: &MemberRef,
        notice: &DirectNotice,
    ) -> WardenResult<()> {
        let message = CreateMessage::new().embed(render(member, notice));
        member.user_id.direct_message(self.http(), message).await?;
        Ok(())
    }

    async fn find_role(&self, guild_id: GuildId, role_id: RoleId) -> WardenResult<Option<RoleRef>> {
        let cached = self.cache.guild(guild_id).map(|guild| {
            guild.roles.get(&role_id).map(|role| RoleRef {
                id: role.id,
                name: role.name.clone(),
            })
        });
        if let Some(role) = cached {
            return Ok(role);
        }

        let roles = guild_id.roles(self.http()).await?;
        Ok(roles.get(&role_id).map(|role| RoleRef {
            id: role.id,
            name: role.name.clone(),
        }))
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> WardenResult<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(ROLE_REASON))
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> WardenResult<()> {
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some(ROLE_REASON))
            .await?;
        Ok(())
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> WardenResult<()> {
        guild_id
            .kick_with_reason(self.http(), user_id, reason)
            .await?;
        Ok(())
    }

    async fn find_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> WardenResult<Option<MemberRef>> {
        let cached = self
            .cache
            .guild(guild_id)
            .and_then(|guild| guild.members.get(&user_id).map(MemberRef::from_member));
        if cached.is_some() {
            return Ok(cached);
        }

        match guild_id.member(self.http(), user_id).await {
            Ok(member) => Ok(Some(MemberRef::from_member(&member))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn is_administrator(&self, guild_id: GuildId, user_id: UserId) -> WardenResult<bool> {
        let guild = guild_id.to_partial_guild(self.http()).await?;
        if guild.owner_id == user_id {
            return Ok(true);
        }

        let member = guild_id.member(self.http(), user_id).await?;
        let everyone_role_id = RoleId::new(guild_id.get());

        let resolved = guild
            .roles
            .values()
            .filter(|role| role.id == everyone_role_id || member.roles.contains(&role.id))
            .fold(Permissions::empty(), |acc, role| acc | role.permissions);

        Ok(resolved.contains(Permissions::ADMINISTRATOR))
    }
}
