use std::io;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

use view::banner::GLYPH_HEIGHT;
use view::{Badge, BadgeRow, Banner, centered_rect};

use crate::dispatch::{PerformanceState, StatusRenderer, Variant};

const HELP: &str = "1-7 chords · q-u minor · shift: sec.dom · a-' notes · arrows key · space release · tab pedal · ctrl+c quit";

/// Full-screen status display on the alternate screen.
///
/// Owns raw mode for its lifetime; dropping it restores the terminal.
pub struct TerminalScreen {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    prev_log_level: log::LevelFilter,
}

impl TerminalScreen {
    pub fn enter() -> anyhow::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;

        // When stderr is redirected (e.g. `boplicity 2> perf.log`), keep logging
        // enabled. When stderr is a terminal, suppress logging to avoid
        // corrupting the alternate screen.
        let prev_log_level = log::max_level();
        if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            log::set_max_level(log::LevelFilter::Off);
        }

        Ok(TerminalScreen {
            terminal,
            prev_log_level,
        })
    }
}

impl StatusRenderer for TerminalScreen {
    fn render(
        &mut self,
        state: &PerformanceState,
        label: &str,
        variant: Variant,
    ) -> anyhow::Result<()> {
        log::debug!("Status '{label}' (variant {})", variant.index());
        self.terminal.clear()?;
        self.terminal
            .draw(|frame| draw_status(frame, state, label, variant))?;
        Ok(())
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        log::set_max_level(self.prev_log_level);
        let _ = self.terminal.show_cursor();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            log::warn!("Failed to leave raw mode: {e}");
        }
    }
}

fn variant_color(variant: Variant) -> Color {
    match variant {
        Variant::Plain => Color::Green,
        Variant::SubordinateMinor => Color::Magenta,
        Variant::SecondaryDominant => Color::Yellow,
        Variant::Notice => Color::Cyan,
    }
}

pub fn draw_status(frame: &mut Frame, state: &PerformanceState, label: &str, variant: Variant) {
    let color = variant_color(variant);
    let area = frame.area();
    let [main_area, badge_area, help_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" boplicity · {} ", state.tonality));
    let inner = block.inner(main_area);
    frame.render_widget(block, main_area);

    let banner_area = centered_rect(Banner::width(label), GLYPH_HEIGHT, inner);
    frame.render_widget(
        Banner::new(label).style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        banner_area,
    );

    let key = format!("key: {}", state.tonality);
    let grade = format!("grade: {}", state.grade);
    let badges = [
        Badge::new(&key, true),
        Badge::new(&grade, true),
        Badge::new("sec.dom", state.secondary_dominant),
        Badge::new("sub.min", state.subordinate_minor),
        Badge::new("pedal", state.pedal_engaged),
        Badge::new("gesture", state.gesture_enabled),
    ];
    frame.render_widget(
        BadgeRow::new(&badges).active_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        badge_area,
    );

    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        help_area,
    );
}
