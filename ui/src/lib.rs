//! Terminal presentation for swarm-bench runs
//!
//! This crate turns aggregator snapshots into something a human can watch:
//!
//! - A ratatui dashboard redrawn once a second
//! - A log-line presenter for runs without a dashboard
//!
//! Neither writes anything back except the operator's shutdown request.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dashboard;
mod events;
mod format;
mod presenter;

pub use dashboard::{Dashboard, DashboardContext, DashboardView, RECENT_ROWS};
pub use events::{map_key, EventHandler, UiAction};
pub use format::{format_runtime, status_color, status_marker};
pub use presenter::{run_log_presenter, summary_line};

use anyhow::Result;
use chrono::Utc;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::future::Future;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use swarm_bench_core::{Aggregator, ShutdownSignal};

/// Dashboard redraw period
pub const RENDER_INTERVAL: Duration = Duration::from_secs(1);

/// Key polling period
const KEY_POLL: Duration = Duration::from_millis(100);

/// Restores the terminal however the dashboard exits
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into());
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Run the dashboard until `done` fires
///
/// Redraws every second from a fresh snapshot. `q`, `Esc` or Ctrl+C
/// trigger `shutdown`; the dashboard keeps drawing while sessions wind
/// down and returns once `done` fires.
pub async fn run_dashboard(
    aggregator: Arc<Aggregator>,
    context: DashboardContext,
    shutdown: ShutdownSignal,
    done: ShutdownSignal,
) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;
    let dashboard = Dashboard::new();
    let mut events = EventHandler::new();
    let mut last_render: Option<Instant> = None;

    while !done.is_triggered() {
        if last_render.map_or(true, |t| t.elapsed() >= RENDER_INTERVAL) {
            let snapshot = aggregator.snapshot();
            let view = DashboardView {
                context: &context,
                snapshot: &snapshot,
                now: Utc::now(),
                shutting_down: shutdown.is_triggered(),
            };
            guard.terminal.draw(|f| dashboard.render(f, &view))?;
            last_render = Some(Instant::now());
        }

        // Key polling blocks; keep it off the async workers.
        let action = tokio::task::block_in_place(|| events.poll(KEY_POLL))?;
        if action == Some(UiAction::Quit) && !shutdown.is_triggered() {
            tracing::info!("Stop requested from dashboard");
            shutdown.trigger();
            last_render = None;
        }
    }

    Ok(())
}

/// Run the dashboard, logging summary lines instead if it cannot run
///
/// A terminal that refuses raw mode, or a draw error mid-run, hands
/// presentation over to [`run_log_presenter`] until `done` fires.
pub async fn run_dashboard_or_log(
    aggregator: Arc<Aggregator>,
    context: DashboardContext,
    shutdown: ShutdownSignal,
    done: ShutdownSignal,
    fallback_interval: Duration,
) {
    let dashboard = run_dashboard(Arc::clone(&aggregator), context, shutdown, done.clone());
    with_log_fallback(dashboard, aggregator, done, fallback_interval).await;
}

async fn with_log_fallback<F>(
    dashboard: F,
    aggregator: Arc<Aggregator>,
    done: ShutdownSignal,
    interval: Duration,
) where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = dashboard.await {
        tracing::warn!(error = %e, "Dashboard unavailable, logging progress instead");
        run_log_presenter(aggregator, done, interval).await;
    }
}
