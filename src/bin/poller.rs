//! Terminal vidiprinter: polls the feed endpoint and prints each new event as it renders.
//!
//! Commands on stdin: `p` pause/resume, `r` refresh now, `q` quit.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use vidiprinter::poller::{
    client::DEFAULT_ENDPOINT, HttpFeedClient, PollEvent, Poller, RenderedEntry, Session,
    DEFAULT_POLL_INTERVAL,
};

fn print_entry(e: &RenderedEntry) {
    let line = if e.summary.is_empty() {
        e.title.clone()
    } else {
        format!("{} — {}", e.title, e.summary)
    };
    println!(
        "[{}] {:<24} | {:<6} | {}",
        e.display_time,
        e.source,
        e.category.as_str().to_uppercase(),
        line
    );
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    vidiprinter::init_tracing();

    let endpoint = std::env::var("FEED_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let interval = std::env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_POLL_INTERVAL);

    tracing::info!(%endpoint, interval_secs = interval.as_secs(), "vidiprinter poller starting");
    let (handle, mut events) = Poller::spawn(HttpFeedClient::new(endpoint), Session::new(), interval);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Some(PollEvent::Rendered(entry)) => print_entry(&entry),
                Some(PollEvent::State(state)) => tracing::info!(%state, "feed status"),
                None => break,
            },
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(cmd)) => match cmd.trim() {
                    "p" => handle.toggle(),
                    "r" => {
                        let _ = handle.refresh();
                    }
                    "q" => break,
                    "" => {}
                    other => eprintln!("unknown command {other:?} (p = pause/resume, r = refresh, q = quit)"),
                },
                // stdin closed: keep printing until interrupted
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let shown = handle.with_session(|s| s.len());
    handle.shutdown().await;
    println!("vidiprinter stopped after {shown} entries");
}
