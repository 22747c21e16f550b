mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use choguuket_bot::intake::Intake;
use choguuket_bot::render;
use choguuket_bot::worker::run_intake_loop;
use choguuket_core::messaging::{ChatEvent, UpdateSource};
use choguuket_core::{ChatId, DeliveryError};
use common::*;
use tokio_util::sync::CancellationToken;

/// Replays fixed batches, then requests shutdown.
struct ScriptedSource {
    batches: VecDeque<Result<Vec<ChatEvent>, DeliveryError>>,
    shutdown: CancellationToken,
    polls: Arc<AtomicUsize>,
    confirmed: Arc<AtomicBool>,
}

#[async_trait]
impl UpdateSource for ScriptedSource {
    async fn next_batch(&mut self) -> Result<Vec<ChatEvent>, DeliveryError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.batches.pop_front() {
            Some(batch) => batch,
            None => {
                self.shutdown.cancel();
                Ok(Vec::new())
            }
        }
    }

    async fn confirm(&mut self) -> Result<(), DeliveryError> {
        self.confirmed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn start(chat_id: i64) -> ChatEvent {
    ChatEvent::Command {
        chat: chat(chat_id),
        command: "start".into(),
        args: String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_loop_processes_batches_survives_poll_errors_and_confirms() {
    let h = harness();
    let shutdown = CancellationToken::new();
    let polls = Arc::new(AtomicUsize::new(0));
    let confirmed = Arc::new(AtomicBool::new(false));

    let batches = VecDeque::from(vec![
        Ok(vec![
            start(1),
            ChatEvent::WebAppData {
                chat: chat(1),
                data: trip_json(1, "Bishkek", "Osh", tomorrow_at(4), 2),
            },
        ]),
        Err(DeliveryError::Timeout),
        Ok(vec![ChatEvent::WebAppData {
            chat: chat(2),
            data: request_json(2, "Bishkek", "Osh", tomorrow_at(4)),
        }]),
    ]);
    let source = ScriptedSource {
        batches,
        shutdown: shutdown.clone(),
        polls: polls.clone(),
        confirmed: confirmed.clone(),
    };

    run_intake_loop(source, Intake::new(h.ctx.clone()), 4, shutdown).await;

    assert!(polls.load(Ordering::SeqCst) >= 4);
    assert!(confirmed.load(Ordering::SeqCst));
    assert_eq!(h.store.trip_count(), 1);
    assert_eq!(h.store.request_count(), 1);

    let driver = h.messenger.sent_to(ChatId(1));
    assert!(driver.iter().any(|m| m.text == render::GREETING));
    assert!(driver.iter().any(|m| m.text == render::TRIP_CREATED));
    let rider = h.messenger.sent_to(ChatId(2));
    assert_eq!(rider.len(), 2);
    assert!(rider[1].text.starts_with("Найдено поездок: 1"));
}

#[tokio::test]
async fn test_failing_event_does_not_stop_the_batch() {
    let (ctx, messenger) = broken_harness();
    let shutdown = CancellationToken::new();
    let confirmed = Arc::new(AtomicBool::new(false));

    let source = ScriptedSource {
        batches: VecDeque::from(vec![Ok(vec![
            start(1),
            ChatEvent::WebAppData {
                chat: chat(2),
                data: "garbage".into(),
            },
        ])]),
        shutdown: shutdown.clone(),
        polls: Arc::new(AtomicUsize::new(0)),
        confirmed: confirmed.clone(),
    };

    run_intake_loop(source, Intake::new(ctx), 1, shutdown).await;

    assert!(messenger.sent().is_empty());
    assert!(confirmed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cancelled_loop_stops_without_polling() {
    let h = harness();
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let polls = Arc::new(AtomicUsize::new(0));

    let source = ScriptedSource {
        batches: VecDeque::new(),
        shutdown: shutdown.clone(),
        polls: polls.clone(),
        confirmed: Arc::new(AtomicBool::new(false)),
    };

    run_intake_loop(source, Intake::new(h.ctx.clone()), 1, shutdown).await;

    assert_eq!(polls.load(Ordering::SeqCst), 0);
}
