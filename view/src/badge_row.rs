use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// A labelled flag in a [`BadgeRow`].
pub struct Badge<'a> {
    pub text: &'a str,
    pub active: bool,
}

impl<'a> Badge<'a> {
    pub fn new(text: &'a str, active: bool) -> Self {
        Self { text, active }
    }
}

/// A single row of badges separated by a divider, centred in its area.
///
/// Active badges are highlighted; inactive ones are dimmed. Badges that do not
/// fit are cut off at the right edge.
pub struct BadgeRow<'a> {
    badges: &'a [Badge<'a>],
    style: Style,
    active_style: Style,
    separator: &'a str,
}

impl<'a> BadgeRow<'a> {
    pub fn new(badges: &'a [Badge<'a>]) -> Self {
        Self {
            badges,
            style: Style::default().fg(Color::DarkGray),
            active_style: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            separator: " │ ",
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn active_style(mut self, style: Style) -> Self {
        self.active_style = style;
        self
    }

    pub fn separator(mut self, sep: &'a str) -> Self {
        self.separator = sep;
        self
    }

    fn text_width(&self) -> u16 {
        let labels: usize = self.badges.iter().map(|b| b.text.chars().count()).sum();
        let seps = self.badges.len().saturating_sub(1) * self.separator.chars().count();
        (labels + seps) as u16
    }
}

impl Widget for BadgeRow<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = self.text_width();
        let mut x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y;

        let mut put = |x: &mut u16, text: &str, style: Style| {
            for ch in text.chars() {
                if *x >= area.right() {
                    return;
                }
                if let Some(cell) = buf.cell_mut((*x, y)) {
                    cell.set_char(ch);
                    cell.set_style(style);
                }
                *x += 1;
            }
        };

        for (i, badge) in self.badges.iter().enumerate() {
            if i > 0 {
                put(&mut x, self.separator, self.style);
            }
            let style = if badge.active {
                self.active_style
            } else {
                self.style
            };
            put(&mut x, badge.text, style);
        }
    }
}
