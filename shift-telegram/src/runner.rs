//! Dispatcher runner: listens to messages and channel posts, converts them, and drives the
//! relay's handler chain. Replies from the chain are sent back to the originating chat.

use crate::adapters::TelegramMessageWrapper;
use crate::bot_adapter::TelegramPlatform;
use anyhow::Result;
use relay::{HandlerChain, HandlerResponse};
use shift_core::{Platform, RelayMessage};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error, info, instrument};

/// Runs until Ctrl-C. Updates of one chat are handled in arrival order.
#[instrument(skip(platform, chain))]
pub async fn run_dispatcher(platform: Arc<TelegramPlatform>, chain: HandlerChain) -> Result<()> {
    let bot = platform.inner().clone();
    match bot.get_me().await {
        Ok(me) => info!(username = ?me.user.username, "Bot connected"),
        Err(e) => error!(error = %e, "get_me failed, continuing"),
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_update))
        .branch(Update::filter_channel_post().endpoint(on_update));

    info!("Dispatcher started");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![platform, chain])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    info!("Dispatcher stopped");

    Ok(())
}

async fn on_update(
    msg: Message,
    platform: Arc<TelegramPlatform>,
    chain: HandlerChain,
) -> ResponseResult<()> {
    let core_msg = TelegramMessageWrapper(&msg).to_core();
    handle_update(&platform, &chain, &core_msg).await;
    Ok(())
}

/// Drops the bot's own forwarded copies, remembers album members, then runs the chain.
pub(crate) async fn handle_update(
    platform: &TelegramPlatform,
    chain: &HandlerChain,
    message: &RelayMessage,
) -> Option<HandlerResponse> {
    if platform.own_posts().take(message.chat.id, message.id) {
        debug!(
            chat_id = message.chat.id,
            message_id = message.id,
            "Skipping echo of own forward"
        );
        return None;
    }
    platform.albums().record(message);

    info!(
        chat_id = message.chat.id,
        message_id = message.id,
        media = message.media_tag(),
        media_group_id = ?message.media_group_id,
        "Received message"
    );

    match chain.handle(message).await {
        Ok(HandlerResponse::Reply(text)) => {
            if let Err(e) = platform.send_message(message.chat.id, &text).await {
                error!(error = %e, chat_id = message.chat.id, "Failed to send reply");
            }
            Some(HandlerResponse::Reply(text))
        }
        Ok(response) => Some(response),
        Err(e) => {
            error!(error = %e, chat_id = message.chat.id, "Handler chain failed");
            None
        }
    }
}
