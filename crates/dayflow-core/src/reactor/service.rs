//! Tokio wrapper around `PlanReactor`.
//!
//! Runs the reactor on a single owner task: an unbounded command queue
//! serializes all mutations, a debounce sleep drives `tick()`, and watch
//! channels republish the derived state (schedule, next item) to any number
//! of consumers. Windows flush strictly in FIFO order because one loop owns
//! both the queue and the timer.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::{InputsUpdate, PlanReactor};
use crate::events::PlanEvent;
use crate::next_item::NextScheduledItem;
use crate::scheduler::ScheduleResult;

#[derive(Debug)]
enum Command {
    Update(InputsUpdate),
    SetSkipIndex(usize),
    ForceRecompute,
    Clear,
    Shutdown,
}

/// Handle to a running planner loop.
///
/// Cloneable consumers: `watch_schedule()` / `watch_next_item()` receivers
/// observe every publication; `subscribe_events()` yields the event stream
/// (lagging subscribers skip, they are never blocked on).
pub struct PlannerService {
    tx: mpsc::UnboundedSender<Command>,
    schedule_rx: watch::Receiver<Option<Arc<ScheduleResult>>>,
    next_item_rx: watch::Receiver<Option<NextScheduledItem>>,
    events_tx: broadcast::Sender<PlanEvent>,
    handle: JoinHandle<()>,
}

impl PlannerService {
    /// Spawn the planner loop on the current tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        let (schedule_tx, schedule_rx) = watch::channel(None);
        let (next_item_tx, next_item_rx) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(64);
        let events_out = events_tx.clone();

        let handle = tokio::spawn(async move {
            let mut reactor = PlanReactor::new(Utc::now());

            loop {
                let sleep_for = reactor.pending_deadline().map(|deadline| {
                    (deadline - Utc::now())
                        .to_std()
                        .unwrap_or(StdDuration::ZERO)
                });

                let events = tokio::select! {
                    command = rx.recv() => {
                        let now = Utc::now();
                        match command {
                            None | Some(Command::Shutdown) => break,
                            Some(Command::Update(update)) => {
                                reactor.apply(update, now);
                                Vec::new()
                            }
                            Some(Command::SetSkipIndex(index)) => {
                                reactor.set_skip_index(index, now)
                            }
                            Some(Command::ForceRecompute) => reactor.force_recompute(now),
                            Some(Command::Clear) => reactor.clear(now),
                        }
                    }
                    () = maybe_sleep(sleep_for) => reactor.tick(Utc::now()),
                };

                if !events.is_empty() {
                    let _ = schedule_tx.send(reactor.current_schedule());
                    let _ = next_item_tx.send(reactor.current_next_item().cloned());
                    for event in events {
                        let _ = events_out.send(event);
                    }
                }
            }
        });

        PlannerService {
            tx,
            schedule_rx,
            next_item_rx,
            events_tx,
            handle,
        }
    }

    /// Enqueue a partial input update.
    pub fn update(&self, update: InputsUpdate) {
        let _ = self.tx.send(Command::Update(update));
    }

    /// Move the skip cursor (applies without debounce).
    pub fn set_skip_index(&self, index: usize) {
        let _ = self.tx.send(Command::SetSkipIndex(index));
    }

    /// Flush pending updates and recompute now.
    pub fn force_recompute(&self) {
        let _ = self.tx.send(Command::ForceRecompute);
    }

    /// Session-switch reset.
    pub fn clear(&self) {
        let _ = self.tx.send(Command::Clear);
    }

    /// Latest published schedule.
    pub fn current_schedule(&self) -> Option<Arc<ScheduleResult>> {
        self.schedule_rx.borrow().clone()
    }

    /// Latest published next item.
    pub fn current_next_item(&self) -> Option<NextScheduledItem> {
        self.next_item_rx.borrow().clone()
    }

    /// Watch every schedule publication.
    pub fn watch_schedule(&self) -> watch::Receiver<Option<Arc<ScheduleResult>>> {
        self.schedule_rx.clone()
    }

    /// Watch every next-item publication.
    pub fn watch_next_item(&self) -> watch::Receiver<Option<NextScheduledItem>> {
        self.next_item_rx.clone()
    }

    /// Subscribe to the event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlanEvent> {
        self.events_tx.subscribe()
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.tx.send(Command::Shutdown);
        let _ = self.handle.await;
    }
}

/// Sleep until the debounce deadline, or forever when no window is armed.
async fn maybe_sleep(duration: Option<StdDuration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
