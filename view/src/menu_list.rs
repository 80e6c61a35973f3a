use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// One row of a [`MenuList`].
pub struct MenuRow<'a> {
    pub key: &'a str,
    pub label: &'a str,
    /// Rows without an action are drawn dimmed.
    pub actionable: bool,
}

/// A device menu: a title line followed by rows, one of them highlighted.
///
/// Scrolls so the highlighted row is always visible.
pub struct MenuList<'a> {
    title: &'a str,
    rows: &'a [MenuRow<'a>],
    highlight: usize,
    style: Style,
    title_style: Style,
    highlight_style: Style,
    info_style: Style,
    scrollbar: bool,
}

impl<'a> MenuList<'a> {
    pub fn new(title: &'a str, rows: &'a [MenuRow<'a>], highlight: usize) -> Self {
        Self {
            title,
            rows,
            highlight,
            style: Style::default().fg(Color::White),
            title_style: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            highlight_style: Style::default().fg(Color::Black).bg(Color::White),
            info_style: Style::default().fg(Color::DarkGray),
            scrollbar: true,
        }
    }

    pub fn highlight_style(mut self, style: Style) -> Self {
        self.highlight_style = style;
        self
    }

    pub fn scrollbar(mut self, show: bool) -> Self {
        self.scrollbar = show;
        self
    }

    /// First row shown so that `highlight` fits in `visible` rows.
    pub fn offset_for(highlight: usize, visible: usize, len: usize) -> usize {
        if visible == 0 || len <= visible {
            return 0;
        }
        highlight.saturating_sub(visible - 1).min(len - visible)
    }
}

fn put_str(buf: &mut Buffer, x: u16, y: u16, right: u16, text: &str, style: Style) -> u16 {
    let mut x = x;
    for ch in text.chars() {
        if x >= right {
            break;
        }
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_char(ch);
            cell.set_style(style);
        }
        x += 1;
    }
    x
}

impl Widget for MenuList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        put_str(buf, area.x, area.y, area.right(), self.title, self.title_style);

        let visible = area.height.saturating_sub(1) as usize;
        if visible == 0 {
            return;
        }
        let offset = Self::offset_for(self.highlight, visible, self.rows.len());
        let has_scrollbar = self.scrollbar && self.rows.len() > visible;
        let content_right = if has_scrollbar {
            area.right().saturating_sub(1)
        } else {
            area.right()
        };

        for row in 0..visible {
            let idx = offset + row;
            let Some(item) = self.rows.get(idx) else {
                break;
            };
            let y = area.y + 1 + row as u16;
            let style = if idx == self.highlight {
                self.highlight_style
            } else if item.actionable {
                self.style
            } else {
                self.info_style
            };
            // Highlight spans the full row.
            if idx == self.highlight {
                for x in area.x..content_right {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(' ');
                        cell.set_style(style);
                    }
                }
            }
            let mut x = area.x + 1;
            if !item.actionable && !item.key.is_empty() {
                x = put_str(buf, x, y, content_right, item.key, style);
                x += 1;
            }
            put_str(buf, x, y, content_right, item.label, style);
        }

        if has_scrollbar {
            let sb_x = area.right() - 1;
            let total = self.rows.len();
            let thumb_size = ((visible * visible) / total).max(1);
            let max_offset = total - visible;
            let thumb_start = (offset * (visible - thumb_size)) / max_offset;
            for row in 0..visible {
                let y = area.y + 1 + row as u16;
                let in_thumb = row >= thumb_start && row < thumb_start + thumb_size;
                let ch = if in_thumb { '┃' } else { '│' };
                if let Some(cell) = buf.cell_mut((sb_x, y)) {
                    cell.set_char(ch);
                    cell.set_style(self.info_style);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn offset_keeps_highlight_visible() {
        assert_eq!(MenuList::offset_for(0, 3, 10), 0);
        assert_eq!(MenuList::offset_for(2, 3, 10), 0);
        assert_eq!(MenuList::offset_for(5, 3, 10), 3);
        assert_eq!(MenuList::offset_for(9, 3, 10), 7);
        assert_eq!(MenuList::offset_for(4, 8, 5), 0);
    }

    #[test]
    fn renders_title_and_rows() {
        let rows = [
            MenuRow { key: "0", label: "< Back", actionable: true },
            MenuRow { key: "SW:", label: "v1.0", actionable: false },
        ];
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        MenuList::new("System Info", &rows, 0).render(area, &mut buf);
        assert_eq!(row_text(&buf, 0), "System Info");
        assert_eq!(row_text(&buf, 1), " < Back");
        assert_eq!(row_text(&buf, 2), " SW: v1.0");
        assert_eq!(buf[(0, 1)].bg, Color::White);
    }
}
