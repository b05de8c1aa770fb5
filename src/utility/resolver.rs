
use serenity::cache::Cache;
use serenity::http::{CacheHttp, Http};
use serenity::model::prelude::*;
use serenity::prelude::*;

use std::sync::Arc;

use crate::utility::guild_config::GuildConfig;


/// Wraps the gateway context and answers privilege questions for the guild
/// it was created for. Staff is administrator permission or membership in
/// the configured staff role; if neither can be resolved the answer is
/// "not staff" (fail closed).
#[derive(Clone)]
pub struct Resolver {
    ctx: Context,
    guild_id: Option<GuildId>,
}

impl Resolver {

    pub fn new(ctx: Context, guild_id: Option<GuildId>) -> Resolver {
        Resolver { ctx, guild_id }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub async fn resolve_member(&self, guild_id: GuildId, user_id: UserId) -> Option<Member> {
        guild_id.member(&self.ctx, user_id).await.ok()
    }

    pub async fn is_staff(&self, user_id: u64) -> bool {
        let guild = match self.guild_id {
            Some(guild) => guild,
            None => return false,
        };
        let member = match self.resolve_member(guild, UserId::new(user_id)).await {
            Some(member) => member,
            None => return false,
        };

        let config = GuildConfig::load(guild.get()).await;
        if config.staff_role_id != 0
            && member.roles.contains(&RoleId::new(config.staff_role_id)) {
            return true;
        }

        match guild.roles(&self.ctx().http).await {
            Ok(roles) => member.roles.iter()
                .filter_map(|role_id| roles.get(role_id))
                .any(|role| role.permissions.contains(Permissions::ADMINISTRATOR)),
            Err(_) => false,
        }
    }
}

impl CacheHttp for Resolver {
    fn http(&self) -> &Http {
        &self.ctx.http
    }
    fn cache(&self) -> Option<&Arc<Cache>> {
        Some(&self.ctx.cache)
    }
}

impl AsRef<Http> for Resolver {
    fn as_ref(&self) -> &Http {
        &self.ctx.http
    }
}
