//! Per-chat bookkeeping around the dialogue storage.
//!
//! Handlers and generation tasks both read, change and write back the same
//! [`Controller`]. Every such round trip holds the chat's [`ChatLocks`]
//! entry, so one can never overwrite what the other just stored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage, InMemStorageError};
use teloxide::types::{ChatId, MessageId};
use tokio::sync::OwnedMutexGuard;

use crate::quiz::client::QuizClient;
use crate::quiz::flow::{Controller, Notice, PendingRequest};

pub type QuizStorage = InMemStorage<Controller>;
pub type QuizDialogue = Dialogue<Controller, QuizStorage>;

/// What a chat remembers outside its controller.
#[derive(Debug, Default)]
pub struct ChatSlot {
    /// The message currently showing the quiz. Older screens are stale.
    pub screen: Option<MessageId>,
}

impl ChatSlot {
    /// Whether a button pressed on `message` belongs to the current screen.
    pub fn is_current(&self, message: MessageId) -> bool {
        self.screen.map_or(true, |screen| screen == message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatLocks {
    slots: Arc<Mutex<HashMap<ChatId, Arc<tokio::sync::Mutex<ChatSlot>>>>>,
}

impl ChatLocks {
    /// Waits until nothing else works on `chat_id`.
    pub async fn lock(&self, chat_id: ChatId) -> OwnedMutexGuard<ChatSlot> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(chat_id).or_default().clone()
        };
        slot.lock_owned().await
    }
}

/// A controller snapshot after a stored change.
#[derive(Debug)]
pub struct Updated<T> {
    pub controller: Controller,
    pub notice: Option<Notice>,
    pub output: T,
}

/// Loads the chat's controller, runs `f` on it and stores the result.
///
/// The caller must hold the chat's lock for the whole call.
pub async fn update<T>(
    dialogue: &QuizDialogue,
    f: impl FnOnce(&mut Controller) -> T,
) -> Result<Updated<T>, InMemStorageError> {
    let mut controller = dialogue.get_or_default().await?;
    let output = f(&mut controller);
    let notice = controller.take_notice();
    dialogue.update(controller.clone()).await?;
    Ok(Updated {
        controller,
        notice,
        output,
    })
}

/// The stored outcome of a generation request, plus the screen to redraw.
#[derive(Debug)]
pub struct Generated {
    pub controller: Controller,
    pub notice: Option<Notice>,
    pub screen: Option<MessageId>,
}

/// Runs `pending` and stores its outcome. Returns `None` when a newer
/// request or a view change made the outcome irrelevant.
pub async fn run_generation(
    client: &QuizClient,
    dialogue: &QuizDialogue,
    locks: &ChatLocks,
    pending: PendingRequest,
) -> Result<Option<Generated>, InMemStorageError> {
    let outcome = client
        .request_generated_quiz(&pending.params, pending.token())
        .await;
    match &outcome {
        Ok(quiz) => debug!("Request {} produced {} questions", pending.id, quiz.len()),
        Err(e) if e.is_cancelled() => debug!("Request {} was cancelled", pending.id),
        Err(e) => debug!("Request {} failed: {}", pending.id, e),
    }

    let slot = locks.lock(dialogue.chat_id()).await;
    let updated = update(dialogue, |controller| {
        controller.complete_generation(pending.id, outcome)
    })
    .await?;
    if !updated.output {
        return Ok(None);
    }

    Ok(Some(Generated {
        controller: updated.controller,
        notice: updated.notice,
        screen: slot.screen,
    }))
}
