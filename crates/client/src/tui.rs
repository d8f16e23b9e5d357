use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use overnet::{ConnectionState, MovementState, NetworkStats, OnlineSession};

const MAX_LOG_LINES: usize = 500;

/// Log records captured for the log pane. Handed to `env_logger` as its
/// output pipe.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<LogLines>>,
}

#[derive(Default)]
struct LogLines {
    lines: VecDeque<String>,
    partial: String,
}

impl LogBuffer {
    pub fn snapshot(&self, count: usize, scroll: usize) -> Vec<String> {
        let Ok(inner) = self.inner.lock() else {
            return Vec::new();
        };
        let lines = &inner.lines;
        let end = lines.len().saturating_sub(scroll);
        let start = end.saturating_sub(count);
        lines.range(start..end).cloned().collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Ok(mut inner) = self.inner.lock() else {
            return Ok(buf.len());
        };

        inner.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(end) = inner.partial.find('\n') {
            let line: String = inner.partial.drain(..=end).collect();
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            if inner.lines.len() == MAX_LOG_LINES {
                inner.lines.pop_front();
            }
            inner.lines.push_back(line.to_string());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct TuiState {
    pub log: LogBuffer,
    scroll: usize,
}

impl TuiState {
    pub fn new(log: LogBuffer) -> Self {
        Self { log, scroll: 0 }
    }

    pub fn scroll_up(&mut self) {
        self.scroll = (self.scroll + 5).min(MAX_LOG_LINES);
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_sub(5);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = 0;
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, session: &OnlineSession) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[2]);

    render_header(frame, rows[0], session);
    render_player(frame, middle[0], session);
    render_network(frame, middle[1], session.stats());
    render_actors(frame, bottom[0], session);
    render_log(frame, bottom[1], state);
    render_help(frame, rows[3]);
}

fn state_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting | ConnectionState::Transferring => Color::Yellow,
        ConnectionState::Disconnected => Color::Red,
    }
}

fn render_header(frame: &mut Frame, area: Rect, session: &OnlineSession) {
    let block = Block::default()
        .title(format!(" Overnet - {} ", session.address()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let line = Line::from(vec![
        Span::styled(
            session.state().as_str(),
            Style::default().fg(state_color(session.state())),
        ),
        Span::raw(format!(
            "  |  Ticket: {}  |  Actors: {}  |  Assets: {}",
            session.ticket().unwrap_or("-"),
            session.actors().len(),
            session.assets().len()
        )),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn label(name: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", name), Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

fn render_player(frame: &mut Frame, area: Rect, session: &OnlineSession) {
    let block = Block::default()
        .title(" Player ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let player = session.player();
    let lines = vec![
        label(
            "Position",
            format!(
                "({:.1}, {:.1}, {:.1}) {}",
                player.position.x,
                player.position.y,
                player.position.z,
                player.heading.as_str()
            ),
        ),
        label(
            "Health",
            format!("{}/{}", player.health, player.base_health),
        ),
        label(
            "Money",
            format!("{}  Items: {}", player.money, player.items.len()),
        ),
        label(
            "Map",
            player.map_path.clone().unwrap_or_else(|| "-".to_string()),
        ),
        label(
            "Input",
            if player.input_locked { "locked" } else { "free" }.to_string(),
        ),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_network(frame: &mut Frame, area: Rect, net: &NetworkStats) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let lines = vec![
        label(
            "Packets",
            format!("{} sent / {} recv", net.packets_sent, net.packets_received),
        ),
        label(
            "Bytes",
            format!(
                "{} sent / {} recv",
                format_bytes(net.bytes_sent),
                format_bytes(net.bytes_received)
            ),
        ),
        label(
            "RTT",
            format!("{:.1}ms (+/- {:.1}ms)", net.rtt_ms, net.rtt_variance),
        ),
        label(
            "Reliable",
            format!(
                "{} pending, {} resent",
                net.pending_reliable, net.packets_resent
            ),
        ),
        Line::from(vec![
            Span::styled("Packet Loss: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.1}%", net.packet_loss_percent),
                Style::default().fg(if net.packet_loss_percent > 5.0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_actors(frame: &mut Frame, area: Rect, session: &OnlineSession) {
    let block = Block::default()
        .title(" Actors ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let mut actors: Vec<_> = session.actors().iter().collect();
    actors.sort_by(|a, b| a.ticket.cmp(&b.ticket));

    let items: Vec<ListItem> = actors
        .into_iter()
        .map(|actor| {
            let pose = session.poses().get(&actor.ticket);
            let movement = match pose.map(|p| p.movement) {
                Some(MovementState::Walking) => "walk",
                Some(MovementState::Running) => "run",
                _ => "idle",
            };
            let position = pose
                .map(|p| p.position)
                .unwrap_or_else(|| actor.tracker.end());

            let style = if actor.is_excluded() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };

            ListItem::new(format!(
                "{} {} ({:.1}, {:.1}) {}",
                actor.ticket, actor.name, position.x, position.y, movement
            ))
            .style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = state
        .log
        .snapshot(visible, state.scroll)
        .into_iter()
        .map(|line| {
            let color = if line.contains("ERROR") {
                Color::Red
            } else if line.contains("WARN") {
                Color::Yellow
            } else {
                Color::Gray
            };
            ListItem::new(line).style(Style::default().fg(color))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("q/ESC quit  |  PgUp/PgDn scroll log  |  End follow log")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_log_buffer_keeps_tail() {
        let mut log = LogBuffer::default();
        for i in 0..MAX_LOG_LINES + 10 {
            writeln!(log, "line {}", i).unwrap();
        }

        let tail = log.snapshot(2, 0);
        assert_eq!(
            tail,
            vec![
                format!("line {}", MAX_LOG_LINES + 8),
                format!("line {}", MAX_LOG_LINES + 9)
            ]
        );
        assert_eq!(log.snapshot(1, 1), vec![format!("line {}", MAX_LOG_LINES + 8)]);
    }
}
