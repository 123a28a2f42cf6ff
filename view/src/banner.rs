use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

/// Rows in every glyph.
pub const GLYPH_HEIGHT: u16 = 5;

const FILL: &str = "█";

/// Large block-letter text, centred in its area.
///
/// Falls back to a single line of plain text when the area is too small.
/// Lowercase letters without their own glyph use the uppercase one.
pub struct Banner<'a> {
    text: &'a str,
    style: Style,
}

impl<'a> Banner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            style: Style::default(),
        }
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Width in cells of `text` rendered as block letters.
    pub fn width(text: &str) -> u16 {
        let glyphs: u16 = text.chars().map(|c| glyph(c)[0].len() as u16).sum();
        let gaps = text.chars().count().saturating_sub(1) as u16;
        glyphs + gaps
    }
}

impl Widget for Banner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = Banner::width(self.text);
        if width > area.width || GLYPH_HEIGHT > area.height {
            let len = (self.text.chars().count() as u16).min(area.width);
            let x = area.x + (area.width - len) / 2;
            let y = area.y + area.height / 2;
            buf.set_stringn(x, y, self.text, len as usize, self.style);
            return;
        }

        let mut x = area.x + (area.width - width) / 2;
        let y = area.y + (area.height - GLYPH_HEIGHT) / 2;

        for c in self.text.chars() {
            let rows = glyph(c);
            for (dy, row) in rows.iter().enumerate() {
                for (dx, px) in row.bytes().enumerate() {
                    if px != b'#' {
                        continue;
                    }
                    if let Some(cell) = buf.cell_mut((x + dx as u16, y + dy as u16)) {
                        cell.set_symbol(FILL);
                        cell.set_style(self.style);
                    }
                }
            }
            x += rows[0].len() as u16 + 1;
        }
    }
}

type Glyph = [&'static str; GLYPH_HEIGHT as usize];

fn glyph(c: char) -> &'static Glyph {
    lowercase(c)
        .or_else(|| uppercase(c.to_ascii_uppercase()))
        .unwrap_or(&UNKNOWN)
}

const UNKNOWN: Glyph = ["## ", "  #", " # ", "   ", " # "];

fn lowercase(c: char) -> Option<&'static Glyph> {
    let g: &'static Glyph = match c {
        'b' => &["#  ", "#  ", "## ", "# #", "## "],
        'i' => &["#", " ", "#", "#", "#"],
        'v' => &["   ", "   ", "# #", "# #", " # "],
        _ => return None,
    };
    Some(g)
}

fn uppercase(c: char) -> Option<&'static Glyph> {
    let g: &'static Glyph = match c {
        'A' => &[" # ", "# #", "###", "# #", "# #"],
        'B' => &["## ", "# #", "## ", "# #", "## "],
        'C' => &[" ##", "#  ", "#  ", "#  ", " ##"],
        'D' => &["## ", "# #", "# #", "# #", "## "],
        'E' => &["###", "#  ", "## ", "#  ", "###"],
        'F' => &["###", "#  ", "## ", "#  ", "#  "],
        'G' => &[" ##", "#  ", "# #", "# #", " ##"],
        'H' => &["# #", "# #", "###", "# #", "# #"],
        'I' => &["###", " # ", " # ", " # ", "###"],
        'J' => &["  #", "  #", "  #", "# #", " # "],
        'K' => &["# #", "# #", "## ", "# #", "# #"],
        'L' => &["#  ", "#  ", "#  ", "#  ", "###"],
        'M' => &["#   #", "## ##", "# # #", "#   #", "#   #"],
        'N' => &["#  #", "## #", "# ##", "#  #", "#  #"],
        'O' => &[" # ", "# #", "# #", "# #", " # "],
        'P' => &["## ", "# #", "## ", "#  ", "#  "],
        'Q' => &[" # ", "# #", "# #", "## ", " ##"],
        'R' => &["## ", "# #", "## ", "# #", "# #"],
        'S' => &[" ##", "#  ", " # ", "  #", "## "],
        'T' => &["###", " # ", " # ", " # ", " # "],
        'U' => &["# #", "# #", "# #", "# #", "###"],
        'V' => &["# #", "# #", "# #", "# #", " # "],
        'W' => &["#   #", "#   #", "# # #", "## ##", "#   #"],
        'X' => &["# #", "# #", " # ", "# #", "# #"],
        'Y' => &["# #", "# #", " # ", " # ", " # "],
        'Z' => &["###", "  #", " # ", "#  ", "###"],
        '0' => &["###", "# #", "# #", "# #", "###"],
        '1' => &[" # ", "## ", " # ", " # ", "###"],
        '2' => &["## ", "  #", " # ", "#  ", "###"],
        '3' => &["## ", "  #", " # ", "  #", "## "],
        '4' => &["# #", "# #", "###", "  #", "  #"],
        '5' => &["###", "#  ", "## ", "  #", "## "],
        '6' => &[" ##", "#  ", "###", "# #", "###"],
        '7' => &["###", "  #", " # ", " # ", " # "],
        '8' => &["###", "# #", "###", "# #", "###"],
        '9' => &["###", "# #", "###", "  #", "## "],
        '#' => &[" # # ", "#####", " # # ", "#####", " # # "],
        '/' => &["  #", "  #", " # ", "#  ", "#  "],
        '°' => &["###", "# #", "###", "   ", "   "],
        '-' => &["   ", "   ", "###", "   ", "   "],
        '+' => &["   ", " # ", "###", " # ", "   "],
        '?' => &UNKNOWN,
        ' ' => &["  ", "  ", "  ", "  ", "  "],
        _ => return None,
    };
    Some(g)
}
