//! Formatting helpers shared by the dashboard and the log presenter

use std::time::Duration;

use ratatui::style::Color;
use swarm_bench_core::SessionStatus;

/// `MM:SS`, or `HH:MM:SS` once an hour has passed
pub fn format_runtime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Display colour for a status
pub fn status_color(status: SessionStatus) -> Color {
    match status {
        SessionStatus::Idle => Color::DarkGray,
        SessionStatus::Connecting => Color::Yellow,
        SessionStatus::Connected => Color::Green,
        SessionStatus::Retrying => Color::Cyan,
        SessionStatus::Failed => Color::Red,
        SessionStatus::Cancelled => Color::Gray,
    }
}

/// Single-character marker for a status
pub fn status_marker(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Idle => "○",
        SessionStatus::Connecting => "◐",
        SessionStatus::Connected => "●",
        SessionStatus::Retrying => "↻",
        SessionStatus::Failed => "✗",
        SessionStatus::Cancelled => "■",
    }
}
