mod action;
mod chat;
mod config;
mod quiz;
mod render;

use std::sync::Arc;

use action::Action;
use chat::{ChatLocks, QuizDialogue, QuizStorage};
use config::Config;
use dotenv::dotenv;
use log::{debug, info, warn};
use quiz::{
    client::QuizClient,
    flow::{Controller, Notice, NoticeKind, PendingRequest, View},
    health::{self, ServiceStatus},
};
use teloxide::{
    dispatching::dialogue,
    prelude::*,
    types::{MessageId, ParseMode},
    ApiError, RequestError,
};
use tokio::sync::watch;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type StatusWatch = watch::Receiver<ServiceStatus>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting quiz player bot...");

    let config = Config::from_env()?;
    let client = Arc::new(QuizClient::new(&config.api_base_url, config.request_timeout)?);
    info!("Using the quiz service at {}", client.base_url());

    let status = health::spawn_probe(client.clone(), config.health_interval);

    let bot = Bot::from_env();

    let handler = dialogue::enter::<Update, QuizStorage, Controller, _>()
        .branch(Update::filter_message().endpoint(receive_message))
        .branch(Update::filter_callback_query().endpoint(receive_action));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            QuizStorage::new(),
            ChatLocks::default(),
            client,
            status
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Text messages set the topic on the setup screen. Every message moves the
/// screen to the bottom of the chat and retires the previous one.
async fn receive_message(
    bot: Bot,
    dialogue: QuizDialogue,
    locks: ChatLocks,
    msg: Message,
    status: StatusWatch,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send the quiz topic as text.")
            .await?;
        return Ok(());
    };

    let mut slot = locks.lock(msg.chat.id).await;
    let updated = chat::update(&dialogue, |controller| {
        if !text.starts_with('/') && matches!(controller.view(), View::Setup) {
            debug!("Chat {} set the topic to {:?}", msg.chat.id, text);
            controller.set_topic(text)
        } else {
            Ok(())
        }
    })
    .await?;
    updated.output?;

    let current = status.borrow().clone();
    let screen = render::render(&updated.controller, &current);
    let sent = bot
        .send_message(msg.chat.id, screen.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(screen.keyboard)
        .await?;

    if let Some(previous) = slot.screen.replace(sent.id) {
        // Drops the buttons so only one screen stays live
        if let Err(e) = bot.edit_message_reply_markup(msg.chat.id, previous).await {
            debug!("Could not retire screen {} in chat {}: {}", previous, msg.chat.id, e);
        }
    }
    drop(slot);

    if let Some(notice) = updated.notice {
        post_notice(bot, msg.chat.id, notice);
    }
    Ok(())
}

async fn receive_action(
    bot: Bot,
    dialogue: QuizDialogue,
    locks: ChatLocks,
    q: CallbackQuery,
    client: Arc<QuizClient>,
    status: StatusWatch,
) -> HandlerResult {
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let action = match q.data.as_deref().map(str::parse::<Action>) {
        Some(Ok(action)) => action,
        other => {
            warn!("Ignoring callback with unexpected data: {:?}", other);
            bot.answer_callback_query(q.id).await?;
            return Ok(());
        }
    };

    let mut slot = locks.lock(message.chat.id).await;
    if !slot.is_current(message.id) {
        debug!("Chat {} pressed {} on a retired screen", message.chat.id, action);
        bot.answer_callback_query(q.id)
            .text("This screen is out of date, use the latest one.")
            .await?;
        return Ok(());
    }
    // Acknowledge right away so the button stops spinning
    bot.answer_callback_query(q.id.clone()).await?;
    slot.screen = Some(message.id);

    let updated = chat::update(&dialogue, |controller| {
        debug!(
            "Chat {} pressed {} on the {} screen",
            message.chat.id,
            action,
            controller.view().name()
        );
        match action::apply(controller, action) {
            Ok(pending) => pending,
            Err(e) => {
                // Usually a button from an older screen
                debug!("Action {} rejected: {}", action, e);
                controller.raise(NoticeKind::Info, format!("That button no longer applies: {}.", e));
                None
            }
        }
    })
    .await?;

    let current = status.borrow().clone();
    show(&bot, message.chat.id, message.id, &updated.controller, &current).await?;
    drop(slot);

    if let Some(notice) = updated.notice {
        post_notice(bot.clone(), message.chat.id, notice);
    }
    if let Some(pending) = updated.output {
        spawn_generation(bot, dialogue, locks, client, status, pending);
    }
    Ok(())
}

/// Redraws the screen message in place.
async fn show(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    controller: &Controller,
    status: &ServiceStatus,
) -> HandlerResult {
    let screen = render::render(controller, status);
    match bot
        .edit_message_text(chat_id, message_id, screen.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(screen.keyboard)
        .await
    {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Posts a notice as its own message and deletes it once it timed out.
fn post_notice(bot: Bot, chat_id: ChatId, notice: Notice) {
    tokio::spawn(async move {
        let icon = match notice.kind {
            NoticeKind::Error => "⚠️",
            NoticeKind::Info => "ℹ️",
        };
        let sent = match bot
            .send_message(chat_id, format!("{} {}", icon, notice.text))
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                warn!("Could not post a notice to chat {}: {}", chat_id, e);
                return;
            }
        };

        tokio::time::sleep_until(notice.expires_at()).await;
        if let Err(e) = bot.delete_message(chat_id, sent.id).await {
            // The user may have deleted it already
            debug!("Could not remove notice {} in chat {}: {}", sent.id, chat_id, e);
        }
    });
}

fn spawn_generation(
    bot: Bot,
    dialogue: QuizDialogue,
    locks: ChatLocks,
    client: Arc<QuizClient>,
    status: StatusWatch,
    pending: PendingRequest,
) {
    tokio::spawn(async move {
        let chat_id = dialogue.chat_id();
        if let Err(e) = finish_generation(bot, dialogue, locks, client, status, pending).await {
            warn!("Quiz generation for chat {} failed to report back: {}", chat_id, e);
        }
    });
}

/// Runs the request and redraws the chat's current screen with its outcome,
/// unless a newer request took its place in the meantime.
async fn finish_generation(
    bot: Bot,
    dialogue: QuizDialogue,
    locks: ChatLocks,
    client: Arc<QuizClient>,
    status: StatusWatch,
    pending: PendingRequest,
) -> HandlerResult {
    let id = pending.id;
    let Some(generated) = chat::run_generation(&client, &dialogue, &locks, pending).await? else {
        debug!("Outcome of request {} no longer applies", id);
        return Ok(());
    };
    info!(
        "Request {} finished on the {} screen",
        id,
        generated.controller.view().name()
    );

    let chat_id = dialogue.chat_id();
    if let Some(screen) = generated.screen {
        let current = status.borrow().clone();
        show(&bot, chat_id, screen, &generated.controller, &current).await?;
    }

    if let Some(notice) = generated.notice {
        post_notice(bot, chat_id, notice);
    }
    Ok(())
}
