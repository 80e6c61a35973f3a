use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

/// Horizontal bar showing where a value sits inside `[min, max]`, with the
/// numeric value and range limits underneath.
pub struct ValueGraph<'a> {
    name: &'a str,
    value: f32,
    min: f32,
    max: f32,
    bar_style: Style,
    track_style: Style,
}

impl<'a> ValueGraph<'a> {
    pub fn new(name: &'a str, value: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            value,
            min,
            max,
            bar_style: Style::default().fg(Color::Cyan),
            track_style: Style::default().fg(Color::DarkGray),
        }
    }

    pub fn bar_style(mut self, style: Style) -> Self {
        self.bar_style = style;
        self
    }

    /// Number of filled cells out of `width`.
    pub fn filled(value: f32, min: f32, max: f32, width: u16) -> u16 {
        if max <= min {
            return 0;
        }
        let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
        (ratio * width as f32).round() as u16
    }
}

impl Widget for ValueGraph<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 3 || area.width == 0 {
            return;
        }
        buf.set_stringn(area.x, area.y, self.name, area.width as usize, Style::default());

        let filled = Self::filled(self.value, self.min, self.max, area.width);
        for i in 0..area.width {
            let (ch, style) = if i < filled {
                ('█', self.bar_style)
            } else {
                ('░', self.track_style)
            };
            if let Some(cell) = buf.cell_mut((area.x + i, area.y + 1)) {
                cell.set_char(ch);
                cell.set_style(style);
            }
        }

        let y = area.y + 2;
        let min = format!("{:.2}", self.min);
        let max = format!("{:.2}", self.max);
        let value = format!("{:.2}", self.value);
        buf.set_stringn(area.x, y, &min, area.width as usize, self.track_style);
        let mid = area.x + area.width.saturating_sub(value.len() as u16) / 2;
        buf.set_string(mid, y, &value, Style::default());
        let right = area.right().saturating_sub(max.len() as u16);
        buf.set_string(right, y, &max, self.track_style);
    }
}
