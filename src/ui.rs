//! Terminal dashboard: dial, world clock and latest-block panel.

use crate::clock::{
    dial_angle, format_block_time, format_digital, format_long, group_thousands,
};
use crate::timezone::{zone_label, TimeZoneSelection};
use crate::types::{BlockInfo, PollState};
use chrono::{DateTime, Utc};
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine},
        Block, Borders, Paragraph, Wrap,
    },
    Frame,
};
use tokio::sync::{mpsc, watch};
use tracing::debug;

pub const BUY_BITCOIN_URL: &str = "https://global.transak.com/?apiKey=722fb908-3edc-4792-9a98-1d8e2d5e4a24&cryptoCurrencyList=BTC&defaultCryptoCurrency=BTC";

/// Donation links shown under the dial: on-chain, Cash App, Lightning.
pub const SUPPORT_LINKS: [(&str, &str); 3] = [
    ("₿", "mempool.space/address/bc1qqgpph8havxz343ywc82fqy8gkdtpzeg0mpdnu8"),
    ("$", "cash.app/$CMPGFB"),
    ("⚡", "getalby.com/p/cmpgfb"),
];

pub const CREDITS: [&str; 3] = [
    "Built By @CMPGFB",
    "Powered By TwentyOneSociety",
    "2025 © CMPGFB LLC.",
];

const EXPLAINER_INTRO: &str = "Bitcoin creates a new block approximately every 10 minutes, \
forming an immutable chain of time-stamped records. Unlike traditional timekeeping systems \
that rely on centralized authorities, Bitcoin's temporal chain is:";

const EXPLAINER_POINTS: [(&str, &str); 4] = [
    ("Decentralized", "No single entity controls or can manipulate the timestamps"),
    ("Immutable", "Once recorded, block times cannot be altered"),
    ("Global", "The same block height and time are visible to everyone worldwide"),
    ("Precise", "Each block serves as a verifiable timestamp in Bitcoin's chronology"),
];

const EXPLAINER_CLOSING: &str = "This makes Bitcoin not just a currency, but humanity's \
first truly decentralized and tamper-proof time-stamping system.";

const BITCOIN_ORANGE: Color = Color::Rgb(247, 147, 26);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

struct Palette {
    background: Color,
    panel: Color,
    text: Color,
    muted: Color,
    border: Color,
    error: Color,
}

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: Color::Rgb(13, 13, 13),
                panel: Color::Rgb(26, 26, 26),
                text: Color::White,
                muted: Color::Rgb(156, 163, 175),
                border: Color::Rgb(36, 36, 36),
                error: Color::Rgb(248, 113, 113),
            },
            Theme::Light => Palette {
                background: Color::White,
                panel: Color::Rgb(249, 250, 251),
                text: Color::Rgb(13, 13, 13),
                muted: Color::Rgb(75, 85, 99),
                border: Color::Rgb(229, 231, 235),
                error: Color::Rgb(185, 28, 28),
            },
        }
    }
}

pub struct App {
    pub selection: TimeZoneSelection,
    pub theme: Theme,
    poll: watch::Receiver<PollState>,
    refresh: mpsc::Sender<()>,
    now: DateTime<Utc>,
}

impl App {
    pub fn new(
        poll: watch::Receiver<PollState>,
        refresh: mpsc::Sender<()>,
        selection: TimeZoneSelection,
    ) -> Self {
        Self {
            selection,
            theme: Theme::Dark,
            poll,
            refresh,
            now: Utc::now(),
        }
    }

    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    /// Receiver for the poll state this app renders.
    pub fn subscribe_poll(&self) -> watch::Receiver<PollState> {
        self.poll.clone()
    }

    /// Handle a key press. Returns true when the app should quit.
    pub fn on_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return true,
            KeyCode::Left => self.selection.previous_region(),
            KeyCode::Right => self.selection.next_region(),
            KeyCode::Up => self.selection.previous_zone(),
            KeyCode::Down => self.selection.next_zone(),
            KeyCode::Char('t') | KeyCode::Char('T') => self.theme = self.theme.toggle(),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                if self.refresh.try_send(()).is_err() {
                    debug!("Refresh already pending");
                }
            }
            _ => {}
        }
        false
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let palette = app.theme.palette();
    let poll = app.poll.borrow().clone();

    f.render_widget(
        Block::default().style(Style::default().bg(palette.background)),
        f.size(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(1),  // Tagline
            Constraint::Length(12), // Dial
            Constraint::Length(1),  // Motto
            Constraint::Length(1),  // Support links
            Constraint::Min(12),    // Panels
            Constraint::Length(10), // Explainer
            Constraint::Length(3),  // Footer
        ])
        .split(f.size());

    render_header(f, chunks[0], &palette);

    f.render_widget(
        Paragraph::new("Use Bitcoin As Your Global Clock")
            .style(Style::default().fg(palette.muted))
            .alignment(Alignment::Center),
        chunks[1],
    );

    render_dial(f, centered(chunks[2], 26), app, &palette);

    f.render_widget(
        Paragraph::new("One Block At A Time")
            .style(Style::default().fg(palette.muted))
            .alignment(Alignment::Center),
        chunks[3],
    );

    render_support_links(f, chunks[4], &palette);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[5]);

    render_world_clock(f, panels[0], app, &palette);
    render_block_panel(f, panels[1], app, &poll, &palette);
    render_explainer(f, chunks[6], &palette);
    render_footer(f, chunks[7], &poll, &palette);
}

/// Horizontally centre a column of `width` cells inside `area`.
fn centered(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect {
        x: area.x + (area.width - width) / 2,
        width,
        ..area
    }
}

fn panel<'a>(title: &'a str, palette: &Palette) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .style(Style::default().bg(palette.panel).fg(palette.text))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(BITCOIN_ORANGE)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_header(f: &mut Frame, area: Rect, palette: &Palette) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "₿ ",
            Style::default()
                .fg(BITCOIN_ORANGE)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "Time Is Bitcoin",
            Style::default()
                .fg(palette.text)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.border)),
    );
    f.render_widget(header, area);
}

fn render_dial(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let angle = dial_angle(&app.now).to_radians();
    let background = palette.background;
    let face = palette.text;

    let dial = Canvas::default()
        .marker(Marker::Braille)
        .background_color(background)
        .x_bounds([-1.1, 1.1])
        .y_bounds([-1.1, 1.1])
        .paint(move |ctx| {
            ctx.draw(&Circle {
                x: 0.0,
                y: 0.0,
                radius: 1.0,
                color: BITCOIN_ORANGE,
            });
            // Clockwise from twelve o'clock.
            ctx.draw(&CanvasLine {
                x1: 0.0,
                y1: 0.0,
                x2: 0.8 * angle.sin(),
                y2: 0.8 * angle.cos(),
                color: BITCOIN_ORANGE,
            });
            ctx.layer();
            ctx.print(
                0.0,
                -0.45,
                Span::styled("₿", Style::default().fg(face).add_modifier(Modifier::BOLD)),
            );
        });
    f.render_widget(dial, area);
}

fn render_world_clock(f: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let selection = &app.selection;
    let tz = selection.tz();

    let label = Style::default().fg(palette.muted);
    let value = Style::default().fg(palette.text).add_modifier(Modifier::BOLD);

    let lines = vec![
        Line::from(Span::styled("Select Region", label)),
        Line::from(Span::styled(format!("◀ {} ▶", selection.region()), value)),
        Line::from(""),
        Line::from(Span::styled(selection.picker_title(), label)),
        Line::from(Span::styled(
            format!("▲ {} ▼", zone_label(selection.zone())),
            value,
        )),
        Line::from(""),
        Line::from(Span::styled(
            format_digital(app.now, tz),
            Style::default()
                .fg(BITCOIN_ORANGE)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(format_long(app.now, tz), label)),
    ];

    let widget = Paragraph::new(lines)
        .block(panel("World Clock", palette))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn block_lines(
    info: &BlockInfo,
    selection: &TimeZoneSelection,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let label = Style::default().fg(palette.muted);
    let value = Style::default().fg(palette.text).add_modifier(Modifier::BOLD);

    vec![
        Line::from(Span::styled("Current Block", label)),
        Line::from(Span::styled(
            group_thousands(info.height),
            Style::default()
                .fg(BITCOIN_ORANGE)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Time Since Last Block: ", label),
            Span::styled(format!("{} minutes", info.minutes_since_previous()), value),
        ]),
        Line::from(""),
        Line::from(Span::styled(format!("Block Time ({})", selection.zone()), label)),
        Line::from(Span::styled(
            format_block_time(info.timestamp, selection.tz()),
            value,
        )),
        Line::from(Span::styled(
            format!("Block Interval: ~{} minutes", info.median_block_minutes()),
            label,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Buy Bitcoin: ", label),
            Span::styled(
                BUY_BITCOIN_URL,
                Style::default()
                    .fg(BITCOIN_ORANGE)
                    .add_modifier(Modifier::UNDERLINED),
            ),
        ]),
    ]
}

fn render_block_panel(
    f: &mut Frame,
    area: Rect,
    app: &App,
    poll: &PollState,
    palette: &Palette,
) {
    let lines = if poll.loading {
        vec![Line::from(Span::styled(
            "Fetching latest block...",
            Style::default().fg(BITCOIN_ORANGE),
        ))]
    } else if let Some(error) = &poll.error {
        vec![Line::from(Span::styled(
            error.clone(),
            Style::default().fg(palette.error),
        ))]
    } else if let Some(info) = &poll.block_info {
        block_lines(info, &app.selection, palette)
    } else {
        Vec::new()
    };

    let widget = Paragraph::new(lines)
        .block(panel("Latest Bitcoin Block", palette))
        .wrap(Wrap { trim: true });
    f.render_widget(widget, area);
}

fn render_support_links(f: &mut Frame, area: Rect, palette: &Palette) {
    let mut spans = Vec::new();
    for (i, (icon, link)) in SUPPORT_LINKS.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("    "));
        }
        spans.push(Span::styled(format!("{} ", icon), Style::default().fg(BITCOIN_ORANGE)));
        spans.push(Span::styled(*link, Style::default().fg(palette.muted)));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

fn render_explainer(f: &mut Frame, area: Rect, palette: &Palette) {
    let text = Style::default().fg(palette.muted);
    let term = Style::default()
        .fg(BITCOIN_ORANGE)
        .add_modifier(Modifier::BOLD);

    let mut lines = vec![Line::from(Span::styled(EXPLAINER_INTRO, text))];
    lines.extend(EXPLAINER_POINTS.iter().map(|(name, detail)| {
        Line::from(vec![
            Span::styled("  • ", text),
            Span::styled(format!("{}: ", name), term),
            Span::styled(*detail, text),
        ])
    }));
    lines.push(Line::from(Span::styled(EXPLAINER_CLOSING, text)));

    let widget = Paragraph::new(lines)
        .block(panel("Why Bitcoin Is The Perfect Global Clock", palette))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn render_footer(f: &mut Frame, area: Rect, poll: &PollState, palette: &Palette) {
    let key = Style::default()
        .fg(BITCOIN_ORANGE)
        .add_modifier(Modifier::BOLD);
    let text = Style::default().fg(palette.muted);

    let mut spans = vec![
        Span::styled("[q]", key),
        Span::styled(" quit  ", text),
        Span::styled("[←→]", key),
        Span::styled(" region  ", text),
        Span::styled("[↑↓]", key),
        Span::styled(" zone  ", text),
        Span::styled("[r]", key),
        Span::styled(" refresh  ", text),
        Span::styled("[t]", key),
        Span::styled(" theme", text),
    ];
    if poll.retry_count > 0 {
        spans.push(Span::styled(
            format!("  retry {}", poll.retry_count),
            Style::default().fg(palette.error),
        ));
    }

    let credits = CREDITS.join("  ·  ");
    let lines = vec![Line::from(spans), Line::from(Span::styled(credits, text))];

    let footer = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(palette.border)),
    );
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MEDIAN_BLOCK_TIME_SECS;
    use chrono::TimeZone;
    use ratatui::{backend::TestBackend, Terminal};

    fn block_state() -> PollState {
        PollState {
            block_info: Some(BlockInfo {
                height: 800_000,
                timestamp: 1_700_000_100,
                last_block_time: 100,
                median_block_time: MEDIAN_BLOCK_TIME_SECS,
            }),
            error: None,
            loading: false,
            retry_count: 0,
        }
    }

    fn app_with(state: PollState) -> (App, watch::Sender<PollState>, mpsc::Receiver<()>) {
        let (state_tx, state_rx) = watch::channel(state);
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let mut app = App::new(state_rx, refresh_tx, TimeZoneSelection::default());
        app.set_now(Utc.timestamp_opt(1_700_000_000, 0).single().unwrap());
        (app, state_tx, refresh_rx)
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 52)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_renders_block_snapshot() {
        let (app, _state, _refresh) = app_with(block_state());
        let screen = render(&app);

        assert!(screen.contains("800,000"));
        assert!(screen.contains("1 minutes"));
        assert!(screen.contains("Block Time (UTC)"));
        assert!(screen.contains("Nov 14, 2023, 22:15:00"));
        assert!(screen.contains("~10 minutes"));
        assert!(screen.contains("22:13:20"));
    }

    #[test]
    fn test_timezone_change_reformats_without_poll() {
        let (mut app, _state, _refresh) = app_with(block_state());
        app.selection.select_zone("Asia/Tokyo").unwrap();
        let screen = render(&app);

        assert!(screen.contains("Block Time (Asia/Tokyo)"));
        assert!(screen.contains("Nov 15, 2023, 07:15:00"));
        assert!(screen.contains("07:13:20"));
        assert!(!screen.contains("Nov 14, 2023, 22:15:00"));
    }

    #[test]
    fn test_error_hides_snapshot() {
        let mut state = block_state();
        state.error = Some("Unable to connect to mempool.space. Retrying...".to_string());
        state.retry_count = 1;
        let (app, _state, _refresh) = app_with(state);
        let screen = render(&app);

        assert!(screen.contains("Unable to connect to mempool.space. Retrying..."));
        assert!(!screen.contains("800,000"));
        assert!(screen.contains("retry 1"));
    }

    #[test]
    fn test_loading_placeholder() {
        let (app, _state, _refresh) = app_with(PollState::default());
        assert!(render(&app).contains("Fetching latest block..."));
    }

    #[test]
    fn test_state_updates_are_visible() {
        let (app, state, _refresh) = app_with(PollState::default());
        state.send_modify(|s| s.record_success(block_state().block_info.unwrap()));
        assert!(render(&app).contains("800,000"));
    }

    #[test]
    fn test_renders_support_links_and_credits() {
        let (app, _state, _refresh) = app_with(block_state());
        let screen = render(&app);

        assert!(screen.contains("mempool.space/address/bc1qqgpph8havxz343ywc82fqy8gkdtpzeg0mpdnu8"));
        assert!(screen.contains("cash.app/$CMPGFB"));
        assert!(screen.contains("getalby.com/p/cmpgfb"));
        assert!(screen.contains("Built By @CMPGFB"));
        assert!(screen.contains("Powered By TwentyOneSociety"));
        assert!(screen.contains("2025 © CMPGFB LLC."));
    }

    #[test]
    fn test_renders_explainer() {
        let (app, _state, _refresh) = app_with(PollState::default());
        let screen = render(&app);

        assert!(screen.contains("Why Bitcoin Is The Perfect Global Clock"));
        assert!(screen.contains("approximately every 10 minutes"));
        for term in ["Decentralized:", "Immutable:", "Global:", "Precise:"] {
            assert!(screen.contains(term), "missing {}", term);
        }
        assert!(screen.contains("tamper-proof time-stamping system."));
    }

    #[test]
    fn test_buy_link_keeps_partner_key() {
        assert!(BUY_BITCOIN_URL.starts_with("https://global.transak.com/?apiKey=722fb908-"));
        assert!(BUY_BITCOIN_URL.ends_with("defaultCryptoCurrency=BTC"));
    }

    #[test]
    fn test_keys() {
        let (mut app, _state, mut refresh) = app_with(block_state());

        app.on_key(KeyCode::Right);
        assert_eq!(app.selection.region(), "Africa");
        assert_eq!(app.selection.zone(), "Africa/Cairo");
        app.on_key(KeyCode::Down);
        assert_eq!(app.selection.zone(), "Africa/Casablanca");

        app.on_key(KeyCode::Char('t'));
        assert_eq!(app.theme, Theme::Light);

        app.on_key(KeyCode::Char('r'));
        assert!(refresh.try_recv().is_ok());

        assert!(app.on_key(KeyCode::Char('q')));
        assert!(app.on_key(KeyCode::Esc));
    }
}
