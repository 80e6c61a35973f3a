use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

pub struct PluginTile<'a> {
    pub label: &'a str,
    pub bypassed: bool,
    pub selected: bool,
    /// Footswitch number shown in front of the label, if bound.
    pub footswitch: Option<usize>,
}

/// Plugins of the current pedalboard as fixed-width tiles, wrapping onto
/// following lines. Enabled tiles are green, bypassed ones grey, and the
/// selected one is reversed.
pub struct PluginStrip<'a> {
    tiles: &'a [PluginTile<'a>],
    tile_width: u16,
}

impl<'a> PluginStrip<'a> {
    pub fn new(tiles: &'a [PluginTile<'a>]) -> Self {
        Self { tiles, tile_width: 12 }
    }

    pub fn tile_width(mut self, width: u16) -> Self {
        self.tile_width = width.max(3);
        self
    }

    fn tile_style(tile: &PluginTile) -> Style {
        let mut style = if tile.bypassed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green)
        };
        if tile.footswitch.is_some() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if tile.selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        style
    }

    /// Cell position of tile `index` inside `area`, if it fits.
    pub fn tile_origin(&self, index: usize, area: Rect) -> Option<(u16, u16)> {
        let per_row = (area.width / self.tile_width).max(1) as usize;
        let row = (index / per_row) as u16;
        let col = (index % per_row) as u16;
        if row >= area.height {
            return None;
        }
        Some((area.x + col * self.tile_width, area.y + row))
    }
}

impl Widget for PluginStrip<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        for (i, tile) in self.tiles.iter().enumerate() {
            let Some((x, y)) = self.tile_origin(i, area) else {
                break;
            };
            let style = Self::tile_style(tile);
            let text = match tile.footswitch {
                Some(n) => format!("{}:{}", n + 1, tile.label),
                None => tile.label.to_string(),
            };
            // Leave one blank column between tiles.
            let width = self.tile_width.saturating_sub(1).min(area.right() - x);
            let mut chars = text.chars();
            for dx in 0..width {
                if let Some(cell) = buf.cell_mut((x + dx, y)) {
                    cell.set_char(chars.next().unwrap_or(' '));
                    cell.set_style(style);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(label: &str, bypassed: bool, selected: bool) -> PluginTile<'_> {
        PluginTile {
            label,
            bypassed,
            selected,
            footswitch: None,
        }
    }

    #[test]
    fn tiles_wrap_to_next_line() {
        let tiles = [tile("a", false, false), tile("b", false, false), tile("c", false, false)];
        let strip = PluginStrip::new(&tiles).tile_width(5);
        let area = Rect::new(0, 0, 10, 2);
        assert_eq!(strip.tile_origin(1, area), Some((5, 0)));
        assert_eq!(strip.tile_origin(2, area), Some((0, 1)));
        assert_eq!(strip.tile_origin(4, area), None);
    }

    #[test]
    fn styles_follow_state() {
        let tiles = [
            tile("reverb", true, false),
            PluginTile {
                label: "drive",
                bypassed: false,
                selected: true,
                footswitch: Some(0),
            },
        ];
        let area = Rect::new(0, 0, 24, 1);
        let mut buf = Buffer::empty(area);
        PluginStrip::new(&tiles).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].fg, Color::DarkGray);
        assert_eq!(buf[(12, 0)].symbol(), "1");
        assert_eq!(buf[(14, 0)].symbol(), "d");
        assert_eq!(buf[(12, 0)].fg, Color::Green);
        assert!(buf[(12, 0)].modifier.contains(Modifier::REVERSED));
    }
}
