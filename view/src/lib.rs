pub mod menu_list;
pub mod plugin_strip;
pub mod title_bar;
pub mod value_graph;

pub use menu_list::{MenuList, MenuRow};
pub use plugin_strip::{PluginStrip, PluginTile};
pub use title_bar::TitleBar;
pub use value_graph::ValueGraph;

use ratatui::layout::Rect;

/// Compute a centered rectangle within `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_fits_inside() {
        let r = centered_rect(10, 4, Rect::new(0, 0, 20, 8));
        assert_eq!(r, Rect::new(5, 2, 10, 4));
        let r = centered_rect(40, 40, Rect::new(2, 3, 20, 8));
        assert_eq!(r, Rect::new(2, 3, 20, 8));
    }
}
