//! Blacklist enforcement
//!
//! Applies and revokes the blacklist role and kicks blacklisted members. Every
//! platform call is guarded on its own so one failure never blocks the next
//! step.

use crate::rejoin::{MemberRef, Notifier, Platform, RoleRef};
use poise::serenity_prelude::{GuildId, RoleId, UserId};
use tracing::{error, info, warn};

/// Audit log reason used when kicking a blacklisted member
pub const KICK_REASON: &str = "Blacklisted from the server";

/// Result of trying to grant the blacklist role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleGrant {
    /// No blacklist role is configured
    NotConfigured,
    /// The configured role does not exist in the guild
    RoleMissing,
    Granted(RoleRef),
    Failed,
}

/// Result of trying to remove the blacklist role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRevocation {
    NotConfigured,
    RoleMissing,
    Revoked,
    Failed,
}

/// Result of the kick step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickOutcome {
    Disabled,
    Kicked,
    Failed,
}

/// Applies blacklist consequences according to configuration
#[derive(Debug, Clone, Default)]
pub struct Enforcer {
    blacklist_role: Option<RoleId>,
    kick_enabled: bool,
}

impl Enforcer {
    #[must_use]
    pub const fn new(blacklist_role: Option<RoleId>, kick_enabled: bool) -> Self {
        Self {
            blacklist_role,
            kick_enabled,
        }
    }

    async fn lookup_role(&self, platform: &dyn Platform, guild_id: GuildId) -> Option<RoleRef> {
        let role_id = self.blacklist_role?;
        match platform.find_role(guild_id, role_id).await {
            Ok(Some(role)) => Some(role),
            Ok(None) => {
                warn!("Role not found with ID: {role_id}");
                None
            }
            Err(e) => {
                error!("Failed to look up role {role_id} in guild {guild_id}: {e}");
                None
            }
        }
    }

    /// Grant the blacklist role and audit the grant
    pub async fn apply_role(
        &self,
        platform: &dyn Platform,
        notifier: &Notifier,
        member: &MemberRef,
    ) -> RoleGrant {
        if self.blacklist_role.is_none() {
            return RoleGrant::NotConfigured;
        }
        let Some(role) = self.lookup_role(platform, member.guild_id).await else {
            return RoleGrant::RoleMissing;
        };

        match platform
            .add_role(member.guild_id, member.user_id, role.id)
            .await
        {
            Ok(()) => {
                info!("{} has been assigned the role {}", member.tag, role.name);
                notifier.audit_role_granted(member.user_id, &role);
                RoleGrant::Granted(role)
            }
            Err(e) => {
                error!("Failed to assign role {} to {}: {e}", role.name, member.tag);
                RoleGrant::Failed
            }
        }
    }

    /// Kick the member if kicking is enabled
    pub async fn apply_kick(&self, platform: &dyn Platform, member: &MemberRef) -> KickOutcome {
        if !self.kick_enabled {
            return KickOutcome::Disabled;
        }

        match platform
            .kick(member.guild_id, member.user_id, KICK_REASON)
            .await
        {
            Ok(()) => {
                info!("{} has been kicked from the server", member.tag);
                KickOutcome::Kicked
            }
            Err(e) => {
                error!("Failed to kick {}: {e}", member.tag);
                KickOutcome::Failed
            }
        }
    }

    /// Remove the blacklist role from a member
    pub async fn revoke_role(
        &self,
        platform: &dyn Platform,
        guild_id: GuildId,
        user_id: UserId,
    ) -> RoleRevocation {
        if self.blacklist_role.is_none() {
            return RoleRevocation::NotConfigured;
        }
        let Some(role) = self.lookup_role(platform, guild_id).await else {
            return RoleRevocation::RoleMissing;
        };

        match platform.remove_role(guild_id, user_id, role.id).await {
            Ok(()) => {
                info!("Removed role {} from {user_id}", role.name);
                RoleRevocation::Revoked
            }
            Err(e) => {
                error!("Failed to remove role {} from {user_id}: {e}", role.name);
                RoleRevocation::Failed
            }
        }
    }
}
