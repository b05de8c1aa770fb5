
use serenity::async_trait;
use serenity::builder::{CreateAttachment, CreateEmbed, CreateMessage, CreateChannel, EditMember, GetMessages};
use serenity::model::channel::{PermissionOverwrite, PermissionOverwriteType, ChannelType};
use serenity::model::permissions::Permissions;
use serenity::model::id::{ChannelId, GuildId, MessageId, RoleId, UserId};
use serenity::model::Timestamp;

use crate::utility::error::{EngineError, Result};
use crate::utility::resolver::Resolver;
use crate::utility::traits::ToMessage;


/// Outbound platform actions the engine takes. The engine only ever sees
/// this trait; failures surface as `EngineError::Collaborator` and are
/// logged by the caller, they never tear down the event loop.
#[async_trait]
pub trait Gateway: Send + Sync {

    async fn send_message(&self, channel_id: u64, content: &str) -> Result<()>;

    async fn send_log(&self, channel_id: u64, title: &str, description: &str) -> Result<()>;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()>;

    async fn create_ticket_channel(&self, guild_id: u64, name: &str, opener_id: u64,
                                   staff_role_id: u64, category_id: u64) -> Result<u64>;

    async fn delete_channel(&self, channel_id: u64) -> Result<()>;

    async fn assign_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()>;

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()>;

    /// Communication restriction until a wall-clock unix timestamp.
    async fn restrict_member(&self, guild_id: u64, user_id: u64, until: i64) -> Result<()>;

    async fn unban_member(&self, guild_id: u64, user_id: u64) -> Result<()>;

    /// Unix timestamp of the newest message in the channel, None when empty.
    async fn last_activity(&self, channel_id: u64) -> Result<Option<i64>>;

    /// Channel history rendered oldest-first as transcript lines.
    async fn export_transcript(&self, channel_id: u64) -> Result<Vec<String>>;

    async fn send_transcript(&self, channel_id: u64, filename: &str, content: String) -> Result<()>;
}

pub struct DiscordGateway {
    resolver: Resolver,
}

impl DiscordGateway {

    pub fn new(resolver: Resolver) -> DiscordGateway {
        DiscordGateway { resolver }
    }
}

#[async_trait]
impl Gateway for DiscordGateway {

    async fn send_message(&self, channel_id: u64, content: &str) -> Result<()> {
        ChannelId::new(channel_id)
            .send_message(&self.resolver, content.to_message()).await?;
        Ok(())
    }

    async fn send_log(&self, channel_id: u64, title: &str, description: &str) -> Result<()> {
        let embed = CreateEmbed::new()
            .title(title.to_string())
            .description(description.to_string())
            .color(0x5CA1E1);
        ChannelId::new(channel_id)
            .send_message(&self.resolver, embed.to_message()).await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        ChannelId::new(channel_id)
            .delete_message(&self.resolver, MessageId::new(message_id)).await?;
        Ok(())
    }

    async fn create_ticket_channel(&self, guild_id: u64, name: &str, opener_id: u64,
                                   staff_role_id: u64, category_id: u64) -> Result<u64> {

        // @everyone carries the guild id; hide the channel from it and grant
        // access to the opener and the staff role
        let access = Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);
        let mut overwrites = vec![
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::VIEW_CHANNEL,
                kind: PermissionOverwriteType::Role(RoleId::new(guild_id)),
            },
            PermissionOverwrite {
                allow: access,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(UserId::new(opener_id)),
            },
        ];
        if staff_role_id != 0 {
            overwrites.push(PermissionOverwrite {
                allow: access,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Role(RoleId::new(staff_role_id)),
            });
        }

        let mut builder = CreateChannel::new(name)
            .kind(ChannelType::Text)
            .permissions(overwrites);
        if category_id != 0 {
            builder = builder.category(ChannelId::new(category_id));
        }

        let channel = GuildId::new(guild_id)
            .create_channel(&self.resolver, builder).await?;
        Ok(channel.id.get())
    }

    async fn delete_channel(&self, channel_id: u64) -> Result<()> {
        ChannelId::new(channel_id).delete(&self.resolver).await?;
        Ok(())
    }

    async fn assign_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()> {
        let member = GuildId::new(guild_id)
            .member(&self.resolver, UserId::new(user_id)).await?;
        member.add_role(&self.resolver, RoleId::new(role_id)).await?;
        Ok(())
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()> {
        let member = GuildId::new(guild_id)
            .member(&self.resolver, UserId::new(user_id)).await?;
        member.remove_role(&self.resolver, RoleId::new(role_id)).await?;
        Ok(())
    }

    async fn restrict_member(&self, guild_id: u64, user_id: u64, until: i64) -> Result<()> {
        let until = Timestamp::from_unix_timestamp(until)
            .map_err(|err| EngineError::collaborator(err.to_string()))?;
        let edit = EditMember::new().disable_communication_until(until.to_string());
        GuildId::new(guild_id)
            .edit_member(&self.resolver, UserId::new(user_id), edit).await?;
        Ok(())
    }

    async fn unban_member(&self, guild_id: u64, user_id: u64) -> Result<()> {
        GuildId::new(guild_id)
            .unban(&self.resolver, UserId::new(user_id)).await?;
        Ok(())
    }

    async fn last_activity(&self, channel_id: u64) -> Result<Option<i64>> {
        let messages = ChannelId::new(channel_id)
            .messages(&self.resolver, GetMessages::new().limit(1)).await?;
        Ok(messages.first().map(|message| message.timestamp.unix_timestamp()))
    }

    async fn export_transcript(&self, channel_id: u64) -> Result<Vec<String>> {
        let messages = ChannelId::new(channel_id)
            .messages(&self.resolver, GetMessages::new().limit(100)).await?;
        let lines = messages.iter().rev()
            .map(|message| format!(
                "[{}] {}: {}",
                message.timestamp.unix_timestamp(),
                message.author.name,
                message.content))
            .collect();
        Ok(lines)
    }

    async fn send_transcript(&self, channel_id: u64, filename: &str, content: String) -> Result<()> {
        let attachment = CreateAttachment::bytes(content.into_bytes(), filename.to_string());
        ChannelId::new(channel_id)
            .send_files(&self.resolver, vec![attachment], CreateMessage::default()).await?;
        Ok(())
    }
}
