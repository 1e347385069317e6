//! Chat service

use crate::config::KEY_CHATS;
use crate::context::Context;
use crate::database::ChatMessage;
use crate::error::Result;
use crate::services::actions::ActionLog;
use crate::storage::load;

#[derive(Clone)]
pub struct ChatService {
    ctx: Context,
    actions: ActionLog,
}

impl ChatService {
    pub fn new(ctx: Context, actions: ActionLog) -> Self {
        Self { ctx, actions }
    }

    /// Messages, oldest first
    pub async fn list(&self) -> Vec<ChatMessage> {
        load(self.ctx.store.as_ref(), KEY_CHATS).await
    }

    /// Post a message. Blank messages are ignored and yield `None`.
    pub async fn send(&self, user: &str, text: &str) -> Result<Option<ChatMessage>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let message = ChatMessage {
            id: self.ctx.next_id(),
            user: user.to_string(),
            text: text.to_string(),
            ts: self.ctx.now_ms(),
        };

        self.ctx
            .update(KEY_CHATS, |messages: &mut Vec<ChatMessage>| {
                messages.push(message.clone());
                Ok(())
            })
            .await?;

        self.actions.append("Envió mensaje de chat").await?;
        Ok(Some(message))
    }
}
