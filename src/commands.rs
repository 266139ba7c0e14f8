use crate::rejoin::DiscordPlatform;
use crate::{Data, Error};
use poise::{Context, command};

/// Clear a user's rejoin record and remove the blacklist role
///
/// Usage: `!unblacklist <user ID>`. Administrators only.
#[command(prefix_command, guild_only)]
pub async fn unblacklist(
    ctx: Context<'_, Data, Error>,
    #[rest]
    #[description = "ID of the user to unblacklist"]
    user_id: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let platform = DiscordPlatform::new(ctx.serenity_context());
    let replies = ctx
        .data()
        .warden
        .unblacklist(&platform, guild_id, ctx.author().id, user_id.as_deref())
        .await;

    for reply in replies {
        ctx.reply(reply.to_string()).await?;
    }
    Ok(())
}

/// All commands the framework registers
#[must_use]
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![unblacklist()]
}
