//! TUI rendering logic using ratatui.
//!
//! Handles the actual rendering of the TUI using ratatui widgets,
//! including layout, formatting, and color coding.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use super::progress::TestPhase;
use super::state::TuiState;

/// Get color for speed value based on thresholds.
///
/// - Green: >= 100 Mbps (fast)
/// - Yellow: 25-100 Mbps (moderate)
/// - Red: < 25 Mbps (slow)
pub fn speed_color(speed_mbps: f64) -> Color {
    if speed_mbps >= 100.0 {
        Color::Green
    } else if speed_mbps >= 25.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Format speed value with 2 decimal places.
pub fn format_speed(speed_mbps: f64) -> String {
    format!("{:.2} Mbps", speed_mbps)
}

/// Format latency value with 2 decimal places.
pub fn format_latency(latency_ms: f64) -> String {
    format!("{:.2} ms", latency_ms)
}

/// Format transfer size for display.
pub fn format_size_label(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1}GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Minimal mode threshold in columns.
const MINIMAL_MODE_THRESHOLD: u16 = 60;

/// Check if minimal mode should be used based on terminal width.
pub fn is_minimal_mode(width: u16) -> bool {
    width < MINIMAL_MODE_THRESHOLD
}

/// Render the TUI to the terminal.
///
/// This is the main entry point for rendering. It picks the normal or
/// minimal layout based on terminal width.
pub fn render_frame(frame: &mut Frame, state: &TuiState) {
    if is_minimal_mode(frame.area().width) {
        render_minimal_frame(frame, state);
    } else {
        render_normal_frame(frame, state);
    }
}

/// Render the normal (full-width) TUI layout.
fn render_normal_frame(frame: &mut Frame, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Metadata
            Constraint::Length(3), // Current phase
            Constraint::Min(8),    // Progress/results
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_metadata(frame, chunks[0], state);
    render_phase_indicator(frame, chunks[1], state);
    render_progress_or_results(frame, chunks[2], state);
    render_status_bar(frame, chunks[3], state);
}

/// Render the minimal mode layout for narrow terminals.
pub fn render_minimal_frame(frame: &mut Frame, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Compact metadata
            Constraint::Length(2), // Phase + speed
            Constraint::Min(2),    // Latency/results
        ])
        .split(frame.area());

    render_minimal_metadata(frame, chunks[0], state);
    render_minimal_phase(frame, chunks[1], state);
    render_minimal_results(frame, chunks[2], state);
}

/// Render connection metadata (server, network, IP, VPN).
pub fn render_metadata(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();

    if let Some(ref server) = state.server {
        lines.push(Line::from(vec![
            Span::styled(
                "Server: ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ({})", server.location, server.host),
                Style::default().fg(Color::Cyan),
            ),
        ]));
    }

    if let Some(ref network) = state.network {
        lines.push(Line::from(vec![
            Span::styled(
                "Network: ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ({})", network.isp, network.connection_type),
                Style::default().fg(Color::Cyan),
            ),
        ]));

        lines.push(Line::from(vec![
            Span::styled(
                "IP: ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ({})", network.ip, network.location),
                Style::default().fg(Color::Cyan),
            ),
        ]));

        if network.vpn_active {
            let provider = network
                .vpn_provider
                .as_deref()
                .unwrap_or("active");
            lines.push(Line::from(vec![
                Span::styled(
                    "VPN: ",
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    provider.to_string(),
                    Style::default().fg(Color::Magenta),
                ),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, inner);
}

/// Render the current test phase indicator.
pub fn render_phase_indicator(frame: &mut Frame, area: Rect, state: &TuiState) {
    let phase_text = match state.phase {
        TestPhase::Idle => "◐ Preparing...",
        TestPhase::Ping => "▶ Latency Test",
        TestPhase::Download => "▶ Download Test",
        TestPhase::Upload => "▶ Upload Test",
        TestPhase::Completed => "✓ Completed",
    };

    let style = match state.phase {
        TestPhase::Completed => {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        }
        _ => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    };

    let block = Block::default().borders(Borders::BOTTOM);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = vec![Span::styled(phase_text, style)];
    if state.simulated {
        spans.push(Span::styled(
            "  (simulated)",
            Style::default().fg(Color::Magenta),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans));
    frame.render_widget(paragraph, inner);
}

/// Render progress bars or final results depending on phase.
pub fn render_progress_or_results(
    frame: &mut Frame,
    area: Rect,
    state: &TuiState,
) {
    if let Some(ref error) = state.error {
        render_error(frame, area, error);
        return;
    }

    match state.phase {
        TestPhase::Idle => {
            render_idle(frame, area);
        }
        TestPhase::Ping => {
            render_latency_progress(frame, area, state);
        }
        TestPhase::Download => {
            render_bandwidth_progress(frame, area, state, true);
        }
        TestPhase::Upload => {
            render_bandwidth_progress(frame, area, state, false);
        }
        TestPhase::Completed => {
            render_final_results(frame, area, state);
        }
    }
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &TuiState) {
    let status_text = match state.phase {
        TestPhase::Idle => "Preparing test...".to_string(),
        TestPhase::Ping => {
            format!(
                "Measuring latency ({}/{})...",
                state.latency.current, state.latency.total
            )
        }
        TestPhase::Download => {
            format!(
                "Downloading ({} received)... press q to cancel",
                format_size_label(state.download.bytes)
            )
        }
        TestPhase::Upload => {
            format!(
                "Uploading ({} sent)... press q to cancel",
                format_size_label(state.upload.bytes)
            )
        }
        TestPhase::Completed => {
            "Speed test complete. Press q to quit.".to_string()
        }
    };

    let style = Style::default().fg(Color::DarkGray);
    let paragraph = Paragraph::new(status_text).style(style);
    frame.render_widget(paragraph, area);
}

// --- Helper rendering functions ---

fn render_idle(frame: &mut Frame, area: Rect) {
    let text = "Looking up network details...";
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::NONE));
    frame.render_widget(paragraph, area);
}

/// Render latency test progress.
fn render_latency_progress(frame: &mut Frame, area: Rect, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress bar
            Constraint::Min(1),    // Current sample
        ])
        .split(area);

    let progress = if state.latency.total > 0 {
        (state.latency.current as f64 / state.latency.total as f64).min(1.0)
    } else {
        0.0
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent((progress * 100.0) as u16)
        .label(format!("{}%", (progress * 100.0) as u16));
    frame.render_widget(gauge, chunks[0]);

    let current_text = if let Some(&last) = state.latency.samples.last() {
        format!("Current: {}", format_latency(last))
    } else {
        "Measuring...".to_string()
    };

    let paragraph = Paragraph::new(current_text)
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, chunks[1]);
}

/// Render throughput progress (download or upload).
fn render_bandwidth_progress(
    frame: &mut Frame,
    area: Rect,
    state: &TuiState,
    is_download: bool,
) {
    let bandwidth_state = if is_download {
        &state.download
    } else {
        &state.upload
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress bar
            Constraint::Length(2), // Current speed
            Constraint::Min(1),    // Previous results
        ])
        .split(area);

    let percent = bandwidth_state.percent.clamp(0.0, 100.0) as u16;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE))
        .gauge_style(Style::default().fg(Color::Cyan))
        .percent(percent)
        .label(format!("{}%", percent));
    frame.render_widget(gauge, chunks[0]);

    let speed_text = if let Some(speed) = bandwidth_state.current_speed_mbps {
        let size_label = format_size_label(bandwidth_state.bytes);
        format!("Current: {} ({})", format_speed(speed), size_label)
    } else {
        "Measuring...".to_string()
    };

    let color = bandwidth_state
        .current_speed_mbps
        .map(speed_color)
        .unwrap_or(Color::White);

    let paragraph =
        Paragraph::new(speed_text).style(Style::default().fg(color));
    frame.render_widget(paragraph, chunks[1]);

    // Earlier phases stay on screen once they finish.
    let mut lines = Vec::new();
    if let Some(mean) = state.latency.mean_ms {
        let latency_text = format!("✓ Latency: {}", format_latency(mean));
        let jitter_text = state
            .latency
            .jitter_ms
            .map(|j| format!("  Jitter: {}", format_latency(j)))
            .unwrap_or_default();

        lines.push(Line::from(vec![
            Span::styled(latency_text, Style::default().fg(Color::Green)),
            Span::styled(jitter_text, Style::default().fg(Color::Green)),
        ]));
    }

    if !is_download {
        if let Some(speed) = state.download.final_speed_mbps {
            lines.push(Line::from(Span::styled(
                format!("✓ Download: {}", format_speed(speed)),
                Style::default().fg(Color::Green),
            )));
        }
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, chunks[2]);
}

/// Render final results summary.
fn render_final_results(frame: &mut Frame, area: Rect, state: &TuiState) {
    let mut lines = Vec::new();

    if let Some(mean) = state.latency.mean_ms {
        let mut spans = vec![
            Span::styled(
                "Ping: ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format_latency(mean), Style::default().fg(Color::Cyan)),
        ];

        if let Some(jitter) = state.latency.jitter_ms {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                "Jitter: ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format_latency(jitter),
                Style::default().fg(Color::Cyan),
            ));
        }

        lines.push(Line::from(spans));
    }

    if let Some(speed) = state.download.final_speed_mbps {
        lines.push(Line::from(vec![
            Span::styled(
                "Download: ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format_speed(speed),
                Style::default().fg(speed_color(speed)),
            ),
        ]));
    }

    if let Some(speed) = state.upload.final_speed_mbps {
        lines.push(Line::from(vec![
            Span::styled(
                "Upload: ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format_speed(speed),
                Style::default().fg(speed_color(speed)),
            ),
        ]));
    }

    if state.simulated {
        lines.push(Line::from(Span::styled(
            "Endpoint unreachable, values are simulated.",
            Style::default().fg(Color::Magenta),
        )));
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, area);
}

/// Render error message.
fn render_error(
    frame: &mut Frame,
    area: Rect,
    error: &super::state::ErrorInfo,
) {
    let mut lines = vec![Line::from(Span::styled(
        format!("Error: {}", error.message),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    ))];

    if let Some(ref suggestion) = error.suggestion {
        lines.push(Line::from(Span::styled(
            format!("Suggestion: {}", suggestion),
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, area);
}

// --- Minimal mode rendering functions ---

/// Render compact metadata for minimal mode.
fn render_minimal_metadata(frame: &mut Frame, area: Rect, state: &TuiState) {
    let text = match (&state.server, &state.network) {
        (Some(server), Some(network)) => {
            format!("{} | {}", server.host, network.isp)
        }
        (Some(server), None) => server.host.clone(),
        (None, Some(network)) => network.isp.clone(),
        (None, None) => "Connecting...".to_string(),
    };

    let paragraph =
        Paragraph::new(text).style(Style::default().fg(Color::Cyan));
    frame.render_widget(paragraph, area);
}

/// Render compact phase indicator for minimal mode.
fn render_minimal_phase(frame: &mut Frame, area: Rect, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let (phase_text, progress) = match state.phase {
        TestPhase::Idle => ("◐ Init".to_string(), 0),
        TestPhase::Ping => {
            let pct = if state.latency.total > 0 {
                (state.latency.current * 100) / state.latency.total
            } else {
                0
            };
            (format!("▶ Ping {}%", pct), pct)
        }
        TestPhase::Download => {
            let pct = state.download.percent.clamp(0.0, 100.0) as usize;
            (format!("▶ Down {}%", pct), pct)
        }
        TestPhase::Upload => {
            let pct = state.upload.percent.clamp(0.0, 100.0) as usize;
            (format!("▶ Up {}%", pct), pct)
        }
        TestPhase::Completed => ("✓ Done".to_string(), 100),
    };

    let style = if progress == 100 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let paragraph = Paragraph::new(phase_text).style(style);
    frame.render_widget(paragraph, chunks[0]);

    let speed_text = match state.phase {
        TestPhase::Download => state
            .download
            .current_speed_mbps
            .map(format_speed)
            .unwrap_or_default(),
        TestPhase::Upload => state
            .upload
            .current_speed_mbps
            .map(format_speed)
            .unwrap_or_default(),
        _ => String::new(),
    };

    let color = match state.phase {
        TestPhase::Download => state
            .download
            .current_speed_mbps
            .map(speed_color)
            .unwrap_or(Color::White),
        TestPhase::Upload => state
            .upload
            .current_speed_mbps
            .map(speed_color)
            .unwrap_or(Color::White),
        _ => Color::White,
    };

    let paragraph =
        Paragraph::new(speed_text).style(Style::default().fg(color));
    frame.render_widget(paragraph, chunks[1]);
}

/// Render compact results for minimal mode.
fn render_minimal_results(frame: &mut Frame, area: Rect, state: &TuiState) {
    if let Some(ref error) = state.error {
        let paragraph = Paragraph::new(format!("Error: {}", error.message))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, area);
        return;
    }

    let text = if let Some(mean) = state.latency.mean_ms {
        format!("Ping: {}", format_latency(mean))
    } else {
        String::new()
    };

    let paragraph =
        Paragraph::new(text).style(Style::default().fg(Color::Cyan));
    frame.render_widget(paragraph, area);
}
