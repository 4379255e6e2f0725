//! Dashboard rendering with Ratatui widgets

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use swarm_bench_core::{SessionStatus, StatsSnapshot, TargetId};

use crate::format::{format_runtime, status_color, status_marker};

/// Rows shown in the recent activity panel
pub const RECENT_ROWS: usize = 3;

/// What the dashboard header describes
#[derive(Debug, Clone)]
pub struct DashboardContext {
    /// Target name as entered by the operator
    pub target_name: String,
    /// Resolved target identifier
    pub target_id: TargetId,
}

/// Everything one frame needs
pub struct DashboardView<'a> {
    /// Header information
    pub context: &'a DashboardContext,
    /// Aggregate state to draw
    pub snapshot: &'a StatsSnapshot,
    /// Wall clock for the runtime display
    pub now: DateTime<Utc>,
    /// Whether shutdown has been requested
    pub shutting_down: bool,
}

/// Stateless renderer for the session dashboard
#[derive(Debug, Default)]
pub struct Dashboard;

impl Dashboard {
    /// Create a renderer
    pub fn new() -> Self {
        Self
    }

    /// Render one frame
    pub fn render(&self, frame: &mut Frame, view: &DashboardView<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),                      // Target + runtime
                Constraint::Length(3),                      // Totals
                Constraint::Length(4),                      // Status breakdown
                Constraint::Length(RECENT_ROWS as u16 + 2), // Recent activity
                Constraint::Min(3),                         // Footer
            ])
            .split(frame.size());

        self.render_header(frame, chunks[0], view);
        self.render_totals(frame, chunks[1], view);
        self.render_statuses(frame, chunks[2], view);
        self.render_recent(frame, chunks[3], view);
        self.render_footer(frame, chunks[4], view);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, view: &DashboardView<'_>) {
        let runtime = format_runtime(view.snapshot.stats.runtime(view.now));
        let line = Line::from(vec![
            Span::styled("Target: ", Style::default().fg(Color::Yellow)),
            Span::raw(view.context.target_name.clone()),
            Span::raw(" │ "),
            Span::styled("Target ID: ", Style::default().fg(Color::Yellow)),
            Span::raw(view.context.target_id.to_string()),
            Span::raw(" │ "),
            Span::styled("Runtime: ", Style::default().fg(Color::Yellow)),
            Span::raw(runtime),
        ]);

        let header = Paragraph::new(line).block(
            Block::default()
                .title(" SWARM BENCH DASHBOARD ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        );
        frame.render_widget(header, area);
    }

    fn render_totals(&self, frame: &mut Frame, area: Rect, view: &DashboardView<'_>) {
        let stats = &view.snapshot.stats;
        let line = Line::from(vec![
            Span::styled("Total Sessions: ", Style::default().fg(Color::Yellow)),
            Span::raw(stats.total.to_string()),
            Span::raw(" │ "),
            Span::styled("Success Rate: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("{:.1}%", stats.success_rate),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(" │ "),
            Span::styled("Total Attempts: ", Style::default().fg(Color::Yellow)),
            Span::raw(stats.total_attempts.to_string()),
        ]);

        let totals = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
        frame.render_widget(totals, area);
    }

    fn render_statuses(&self, frame: &mut Frame, area: Rect, view: &DashboardView<'_>) {
        let counts = &view.snapshot.stats.counts;
        let cell = |status: SessionStatus| {
            Span::styled(
                format!("{} {}: {:<8}", status_marker(status), status.label(), counts.get(status)),
                Style::default().fg(status_color(status)),
            )
        };
        let last_update = view
            .snapshot
            .stats
            .last_update
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".into());

        let lines = vec![
            Line::from(vec![
                cell(SessionStatus::Connected),
                Span::raw(" │ "),
                cell(SessionStatus::Connecting),
                Span::raw(" │ "),
                cell(SessionStatus::Retrying),
            ]),
            Line::from(vec![
                cell(SessionStatus::Failed),
                Span::raw(" │ "),
                cell(SessionStatus::Cancelled),
                Span::raw(" │ "),
                Span::styled("Last Update: ", Style::default().fg(Color::Yellow)),
                Span::raw(last_update),
            ]),
        ];

        let statuses = Paragraph::new(lines).block(
            Block::default()
                .title("Sessions")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );
        frame.render_widget(statuses, area);
    }

    fn render_recent(&self, frame: &mut Frame, area: Rect, view: &DashboardView<'_>) {
        let mut lines: Vec<Line> = view
            .snapshot
            .recent(RECENT_ROWS)
            .into_iter()
            .map(|record| {
                let mut spans = vec![
                    Span::styled(
                        format!("{} ", status_marker(record.status)),
                        Style::default().fg(status_color(record.status)),
                    ),
                    Span::raw(format!(
                        "Session #{:<5} - {:<10} (Attempt {})",
                        record.index + 1,
                        record.status.label(),
                        record.attempts
                    )),
                ];
                if let Some(ref error) = record.last_error {
                    spans.push(Span::styled(
                        format!("  {}", error),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "Waiting for sessions...",
                Style::default().fg(Color::DarkGray),
            )));
        }

        let recent = Paragraph::new(lines).block(
            Block::default()
                .title("Recent Activity")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(recent, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect, view: &DashboardView<'_>) {
        let mut footer_text = vec![Span::styled(
            "Press 'q' or 'ESC' to stop",
            Style::default().fg(Color::DarkGray),
        )];

        if view.shutting_down {
            footer_text.push(Span::raw(" | "));
            footer_text.push(Span::styled(
                "Shutting down, waiting for sessions to exit...",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let footer = Paragraph::new(Line::from(footer_text))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));

        frame.render_widget(footer, area);
    }
}
