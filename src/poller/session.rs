//! Client session: watermark, connection state, and the rendered display list.
//!
//! Rendering is incremental. Only items strictly newer than the watermark are
//! shown; they are processed oldest first and each one is inserted at the front
//! of the display list, which leaves the newest item on top.

use std::collections::VecDeque;

use serde::Serialize;
use time::OffsetDateTime;

use crate::classify::{Event, EventKind};
use crate::timestamp::parse_instant;

/// Instant of the most recently rendered event. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(OffsetDateTime);

impl Default for Watermark {
    fn default() -> Self {
        Self(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Watermark {
    pub fn at(instant: OffsetDateTime) -> Self {
        Self(instant)
    }

    pub fn instant(&self) -> OffsetDateTime {
        self.0
    }

    pub fn is_before(&self, instant: OffsetDateTime) -> bool {
        instant > self.0
    }

    fn advance(&mut self, instant: OffsetDateTime) {
        self.0 = self.0.max(instant);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Offline,
    Paused,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Offline => "Offline",
            ConnectionState::Paused => "Paused",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One line on the vidiprinter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEntry {
    /// Wall-clock time the entry was rendered, not the event's own timestamp.
    pub display_time: String,
    pub category: EventKind,
    pub title: String,
    pub summary: String,
    pub source: String,
    #[serde(skip)]
    pub instant: OffsetDateTime,
}

#[derive(Debug)]
pub struct Session {
    watermark: Watermark,
    state: ConnectionState,
    display: VecDeque<RenderedEntry>,
    last_update: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_watermark(Watermark::default())
    }

    pub fn with_watermark(watermark: Watermark) -> Self {
        Self {
            watermark,
            state: ConnectionState::Connecting,
            display: VecDeque::new(),
            last_update: None,
        }
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    /// Display list, top (newest) first.
    pub fn display(&self) -> impl Iterator<Item = &RenderedEntry> {
        self.display.iter()
    }

    pub fn len(&self) -> usize {
        self.display.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }

    /// Label of the most recent render, if any.
    pub fn last_update(&self) -> Option<&str> {
        self.last_update.as_deref()
    }

    /// Render a decoded batch using the local wall clock for display labels.
    pub fn render_batch(&mut self, items: &[Event]) -> Vec<RenderedEntry> {
        self.render_batch_with(items, OffsetDateTime::now_utc(), wall_clock_label)
    }

    /// Render a batch. `now` stands in for items with an empty timestamp and
    /// `label` is called once per rendered entry, at the moment it is rendered.
    ///
    /// Returns the newly rendered entries in render order (oldest first).
    pub fn render_batch_with<F>(
        &mut self,
        items: &[Event],
        now: OffsetDateTime,
        mut label: F,
    ) -> Vec<RenderedEntry>
    where
        F: FnMut() -> String,
    {
        let mut fresh: Vec<(OffsetDateTime, &Event)> = items
            .iter()
            .filter_map(|item| {
                let instant = if item.timestamp.is_empty() {
                    Some(now)
                } else {
                    parse_instant(&item.timestamp)
                };
                instant.map(|at| (at, item))
            })
            .filter(|(at, _)| self.watermark.is_before(*at))
            .collect();
        fresh.sort_by_key(|(at, _)| *at);

        let mut rendered = Vec::with_capacity(fresh.len());
        for (at, item) in fresh {
            self.watermark.advance(at);
            let entry = RenderedEntry {
                display_time: label(),
                category: item.kind,
                title: item.title.clone(),
                summary: item.summary.clone(),
                source: item.source.clone(),
                instant: at,
            };
            self.last_update = Some(entry.display_time.clone());
            self.display.push_front(entry.clone());
            rendered.push(entry);
        }
        rendered
    }
}

/// `HH:MM:SS` in local time.
pub fn wall_clock_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
