// tests/poller.rs
//
// Poll loop behavior with scripted feed clients: immediate first fetch,
// ticking, pause/resume, manual refresh, offline handling, and in-flight
// fetches surviving a pause or being overtaken by a later one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc::UnboundedReceiver, Notify};

use vidiprinter::poller::{ConnectionState, FeedClient, PollEvent, Poller, Session, Watermark};
use vidiprinter::timestamp::parse_instant;
use vidiprinter::{Event, EventKind};

const WAIT: Duration = Duration::from_secs(5);
const LONG: Duration = Duration::from_secs(3600);

fn ev(title: &str, ts: &str, kind: EventKind) -> Event {
    Event {
        title: title.into(),
        summary: String::new(),
        source: "test".into(),
        timestamp: ts.into(),
        kind,
    }
}

/// Hands out one scripted batch per fetch, then empty batches.
struct ScriptedClient {
    batches: Mutex<VecDeque<Vec<Event>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClient {
    fn new(batches: Vec<Vec<Event>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                batches: Mutex::new(batches.into()),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait]
impl FeedClient for ScriptedClient {
    async fn fetch_items(&self) -> anyhow::Result<Vec<Event>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }
}

struct FailingClient;

#[async_trait]
impl FeedClient for FailingClient {
    async fn fetch_items(&self) -> anyhow::Result<Vec<Event>> {
        anyhow::bail!("connection refused")
    }
}

/// Blocks every fetch until the test opens the gate.
struct GatedClient {
    started: Arc<Notify>,
    gate: Arc<Notify>,
    items: Vec<Event>,
}

#[async_trait]
impl FeedClient for GatedClient {
    async fn fetch_items(&self) -> anyhow::Result<Vec<Event>> {
        self.started.notify_one();
        self.gate.notified().await;
        Ok(self.items.clone())
    }
}

/// Each fetch takes the next (gate, batch) slot at call time and holds its
/// response until that gate opens. Fetches past the script return empty.
struct SlottedClient {
    slots: Mutex<VecDeque<(Arc<Notify>, Vec<Event>)>>,
    started: Arc<Notify>,
    returned: Arc<AtomicUsize>,
}

#[async_trait]
impl FeedClient for SlottedClient {
    async fn fetch_items(&self) -> anyhow::Result<Vec<Event>> {
        let slot = self.slots.lock().unwrap().pop_front();
        let Some((gate, items)) = slot else {
            return Ok(Vec::new());
        };
        self.started.notify_one();
        gate.notified().await;
        self.returned.fetch_add(1, Ordering::SeqCst);
        Ok(items)
    }
}

async fn next_rendered(rx: &mut UnboundedReceiver<PollEvent>) -> String {
    loop {
        match tokio::time::timeout(WAIT, rx.recv()).await {
            Ok(Some(PollEvent::Rendered(e))) => return e.title,
            Ok(Some(PollEvent::State(_))) => continue,
            Ok(None) => panic!("poller event channel closed"),
            Err(_) => panic!("timed out waiting for a rendered entry"),
        }
    }
}

async fn wait_for_state(rx: &mut UnboundedReceiver<PollEvent>, want: ConnectionState) {
    loop {
        match tokio::time::timeout(WAIT, rx.recv()).await {
            Ok(Some(PollEvent::State(s))) if s == want => return,
            Ok(Some(_)) => continue,
            Ok(None) => panic!("poller event channel closed"),
            Err(_) => panic!("timed out waiting for state {want}"),
        }
    }
}

async fn wait_for_calls(calls: &AtomicUsize, n: usize) {
    tokio::time::timeout(WAIT, async {
        while calls.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {n} fetches, saw {}", calls.load(Ordering::SeqCst)));
}

#[tokio::test]
async fn first_fetch_is_immediate_and_renders_newest_on_top() {
    let (client, _calls) = ScriptedClient::new(vec![vec![
        ev("T+2", "2024-09-14T15:00:02Z", EventKind::Goal),
        ev("T+1", "2024-09-14T15:00:01Z", EventKind::Card),
        ev("bad", "half past three", EventKind::Update),
    ]]);
    let (handle, mut rx) = Poller::spawn(client, Session::new(), LONG);

    assert_eq!(next_rendered(&mut rx).await, "T+1");
    assert_eq!(next_rendered(&mut rx).await, "T+2");

    let (titles, kinds, state) = handle.with_session(|s| {
        (
            s.display().map(|e| e.title.clone()).collect::<Vec<_>>(),
            s.display().map(|e| e.category).collect::<Vec<_>>(),
            s.state(),
        )
    });
    assert_eq!(titles, vec!["T+2", "T+1"]);
    assert_eq!(kinds, vec![EventKind::Goal, EventKind::Card]);
    assert_eq!(state, ConnectionState::Connected);
    handle.shutdown().await;
}

#[tokio::test]
async fn ticks_fetch_again_and_only_newer_items_render() {
    let (client, calls) = ScriptedClient::new(vec![
        vec![ev("a", "2024-09-14T15:00:00Z", EventKind::Update)],
        vec![
            ev("b", "2024-09-14T15:01:00Z", EventKind::Update),
            ev("a", "2024-09-14T15:00:00Z", EventKind::Update),
        ],
    ]);
    let (handle, mut rx) = Poller::spawn(client, Session::new(), Duration::from_millis(50));

    assert_eq!(next_rendered(&mut rx).await, "a");
    assert_eq!(next_rendered(&mut rx).await, "b");
    wait_for_calls(&calls, 3).await;

    let titles = handle.with_session(|s| s.display().map(|e| e.title.clone()).collect::<Vec<_>>());
    assert_eq!(titles, vec!["b", "a"]);
    handle.shutdown().await;
}

#[tokio::test]
async fn transport_error_marks_offline_and_renders_nothing() {
    let (handle, mut rx) = Poller::spawn(FailingClient, Session::new(), LONG);

    wait_for_state(&mut rx, ConnectionState::Offline).await;
    handle.with_session(|s| {
        assert!(s.is_empty());
        assert_eq!(s.state(), ConnectionState::Offline);
    });

    // Next attempt flips back to Connected optimistically, then Offline again.
    let _ = handle.refresh();
    wait_for_state(&mut rx, ConnectionState::Connected).await;
    wait_for_state(&mut rx, ConnectionState::Offline).await;
    handle.shutdown().await;
}

#[tokio::test]
async fn pause_stops_ticks_and_resume_fetches_immediately() {
    let (client, calls) = ScriptedClient::new(vec![]);
    let (handle, mut rx) = Poller::spawn(client, Session::new(), Duration::from_millis(30));
    wait_for_calls(&calls, 2).await;

    handle.pause();
    assert!(!handle.is_running());
    wait_for_state(&mut rx, ConnectionState::Paused).await;

    // Let any fetch spawned just before the pause land, then check nothing new starts.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let paused_at = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), paused_at, "no ticks while paused");

    // Manual refresh works while paused.
    let _ = handle.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), paused_at + 1);

    handle.resume();
    assert!(handle.is_running());
    wait_for_calls(&calls, paused_at + 2).await;
    handle.shutdown().await;
}

#[tokio::test]
async fn resume_while_running_is_a_no_op() {
    let (client, calls) = ScriptedClient::new(vec![]);
    let (handle, _rx) = Poller::spawn(client, Session::new(), LONG);
    wait_for_calls(&calls, 1).await;

    handle.resume();
    handle.resume();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    handle.shutdown().await;
}

#[tokio::test]
async fn pause_does_not_cancel_an_in_flight_fetch() {
    let started = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let client = GatedClient {
        started: Arc::clone(&started),
        gate: Arc::clone(&gate),
        items: vec![ev("late arrival", "2024-09-14T15:00:00Z", EventKind::Ft)],
    };
    let (handle, mut rx) = Poller::spawn(client, Session::new(), LONG);

    tokio::time::timeout(WAIT, started.notified())
        .await
        .expect("first fetch should start");
    handle.pause();
    wait_for_state(&mut rx, ConnectionState::Paused).await;

    gate.notify_one();
    assert_eq!(next_rendered(&mut rx).await, "late arrival");
    handle.with_session(|s| {
        assert_eq!(s.len(), 1);
        assert_eq!(s.state(), ConnectionState::Paused);
        assert!(s.last_update().is_some());
    });
    handle.shutdown().await;
}

#[tokio::test]
async fn overlapping_fetches_render_in_arrival_order() {
    let first_gate = Arc::new(Notify::new());
    let second_gate = Arc::new(Notify::new());
    let started = Arc::new(Notify::new());
    let returned = Arc::new(AtomicUsize::new(0));
    let client = SlottedClient {
        slots: Mutex::new(VecDeque::from([
            (
                Arc::clone(&first_gate),
                vec![ev("older", "2024-09-14T15:00:00Z", EventKind::Goal)],
            ),
            (
                Arc::clone(&second_gate),
                vec![
                    ev("newer", "2024-09-14T15:05:00Z", EventKind::Card),
                    ev("older", "2024-09-14T15:00:00Z", EventKind::Goal),
                ],
            ),
        ])),
        started: Arc::clone(&started),
        returned: Arc::clone(&returned),
    };
    let (handle, mut rx) = Poller::spawn(client, Session::new(), LONG);

    // Immediate fetch on spawn holds the older batch.
    tokio::time::timeout(WAIT, started.notified())
        .await
        .expect("first fetch should start");
    // A manual refresh overlaps it and holds the newer batch.
    let second = handle.refresh();
    tokio::time::timeout(WAIT, started.notified())
        .await
        .expect("second fetch should start");

    // The later request answers first.
    second_gate.notify_one();
    second.await.unwrap();
    assert_eq!(next_rendered(&mut rx).await, "older");
    assert_eq!(next_rendered(&mut rx).await, "newer");

    // The earlier request lands afterwards; everything in it is at or below the watermark.
    first_gate.notify_one();
    wait_for_calls(&returned, 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    while let Ok(event) = rx.try_recv() {
        assert!(
            !matches!(event, PollEvent::Rendered(_)),
            "stale batch rendered: {event:?}"
        );
    }

    handle.with_session(|s| {
        assert_eq!(
            s.display().map(|e| e.title.as_str()).collect::<Vec<_>>(),
            vec!["newer", "older"]
        );
        assert_eq!(
            s.watermark(),
            Watermark::at(parse_instant("2024-09-14T15:05:00Z").unwrap())
        );
    });
    handle.shutdown().await;
}
