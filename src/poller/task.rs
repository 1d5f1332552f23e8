//! Periodic fetch loop with pause / resume / manual refresh.
//!
//! Every fetch runs as its own task and there is no in-flight guard: if a
//! fetch outlives the tick interval, two can be outstanding and their batches
//! render in the order the responses arrive. Pausing only stops future ticks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::client::FeedClient;
use super::session::{ConnectionState, RenderedEntry, Session};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Paused,
    Stopped,
}

/// Notifications for whoever draws the session (CLI, tests).
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    State(ConnectionState),
    Rendered(RenderedEntry),
}

struct Inner<C> {
    client: C,
    session: Mutex<Session>,
    events: mpsc::UnboundedSender<PollEvent>,
}

impl<C> Inner<C> {
    fn set_state(&self, state: ConnectionState) {
        let changed = {
            let mut s = self.session.lock().expect("session mutex poisoned");
            let changed = s.state() != state;
            s.set_state(state);
            changed
        };
        if changed {
            let _ = self.events.send(PollEvent::State(state));
        }
    }
}

/// Control handle for a running poller.
pub struct PollerHandle<C> {
    inner: Arc<Inner<C>>,
    run: watch::Sender<RunState>,
    ticker: JoinHandle<()>,
}

pub struct Poller;

impl Poller {
    /// Start polling `client` every `interval`, beginning with an immediate fetch.
    pub fn spawn<C: FeedClient>(
        client: C,
        session: Session,
        interval: Duration,
    ) -> (PollerHandle<C>, mpsc::UnboundedReceiver<PollEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            client,
            session: Mutex::new(session),
            events: tx,
        });
        let (run, run_rx) = watch::channel(RunState::Paused);
        let ticker = tokio::spawn(tick_loop(Arc::clone(&inner), run_rx, interval));

        let handle = PollerHandle { inner, run, ticker };
        handle.resume();
        (handle, rx)
    }
}

impl<C: FeedClient> PollerHandle<C> {
    /// Stop scheduled ticks. A fetch already in flight still completes and renders.
    pub fn pause(&self) {
        if *self.run.borrow() != RunState::Running {
            return;
        }
        let _ = self.run.send(RunState::Paused);
        self.inner.set_state(ConnectionState::Paused);
        tracing::info!(target: "poller", "paused");
    }

    /// Restart ticking and fetch immediately. No-op while already running.
    pub fn resume(&self) {
        if *self.run.borrow() != RunState::Paused {
            return;
        }
        self.inner.set_state(ConnectionState::Connected);
        let _ = self.run.send(RunState::Running);
        spawn_fetch(Arc::clone(&self.inner));
        tracing::info!(target: "poller", "running");
    }

    /// Pause if running, resume if paused.
    pub fn toggle(&self) {
        if self.is_running() {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// One fetch outside the normal cadence, whether running or paused.
    pub fn refresh(&self) -> JoinHandle<()> {
        spawn_fetch(Arc::clone(&self.inner))
    }

    pub fn is_running(&self) -> bool {
        *self.run.borrow() == RunState::Running
    }

    /// Run `f` against the current session state.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let s = self.inner.session.lock().expect("session mutex poisoned");
        f(&s)
    }

    /// Stop the tick loop for good.
    pub async fn shutdown(self) {
        let _ = self.run.send(RunState::Stopped);
        let _ = self.ticker.await;
    }
}

async fn tick_loop<C: FeedClient>(
    inner: Arc<Inner<C>>,
    mut run: watch::Receiver<RunState>,
    interval: Duration,
) {
    loop {
        let state = *run.borrow_and_update();
        match state {
            RunState::Stopped => return,
            RunState::Paused => {
                if run.changed().await.is_err() {
                    return;
                }
                continue;
            }
            RunState::Running => {}
        }

        // The immediate fetch on resume is issued by the handle; first tick is one interval out.
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    spawn_fetch(Arc::clone(&inner));
                }
                changed = run.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *run.borrow() != RunState::Running {
                        break;
                    }
                }
            }
        }
    }
}

fn spawn_fetch<C: FeedClient>(inner: Arc<Inner<C>>) -> JoinHandle<()> {
    tokio::spawn(async move { poll_once(&inner).await })
}

/// One fetch + render. State flips to Connected before the request resolves;
/// any failure leaves the display untouched and marks the session Offline.
async fn poll_once<C: FeedClient>(inner: &Inner<C>) {
    inner.set_state(ConnectionState::Connected);

    let items = match inner.client.fetch_items().await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(target: "poller", error = ?e, "feed fetch failed");
            inner.set_state(ConnectionState::Offline);
            return;
        }
    };

    let rendered = {
        let mut s = inner.session.lock().expect("session mutex poisoned");
        s.render_batch(&items)
    };
    tracing::debug!(target: "poller", received = items.len(), rendered = rendered.len(), "poll done");
    for entry in rendered {
        let _ = inner.events.send(PollEvent::Rendered(entry));
    }
}
