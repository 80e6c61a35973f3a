use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// Pedalboard and preset names on one line. Either field may be inverted to
/// show it is the target of the encoder.
pub struct TitleBar<'a> {
    pedalboard: &'a str,
    preset: Option<&'a str>,
    invert_pedalboard: bool,
    invert_preset: bool,
    style: Style,
    separator: &'a str,
}

impl<'a> TitleBar<'a> {
    pub fn new(pedalboard: &'a str, preset: Option<&'a str>) -> Self {
        Self {
            pedalboard,
            preset,
            invert_pedalboard: false,
            invert_preset: false,
            style: Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            separator: " - ",
        }
    }

    pub fn invert(mut self, pedalboard: bool, preset: bool) -> Self {
        self.invert_pedalboard = pedalboard;
        self.invert_preset = preset;
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl Widget for TitleBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let inverted = self.style.add_modifier(Modifier::REVERSED);
        let mut segments = vec![(
            self.pedalboard,
            if self.invert_pedalboard { inverted } else { self.style },
        )];
        if let Some(preset) = self.preset {
            segments.push((self.separator, self.style));
            segments.push((preset, if self.invert_preset { inverted } else { self.style }));
        }

        let mut x = area.x;
        for (text, style) in segments {
            for ch in text.chars() {
                if x >= area.right() {
                    return;
                }
                if let Some(cell) = buf.cell_mut((x, area.y)) {
                    cell.set_char(ch);
                    cell.set_style(style);
                }
                x += 1;
            }
        }
    }
}
