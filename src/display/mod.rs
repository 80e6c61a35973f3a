//! Display sinks. The navigator only ever pushes commands here; nothing is
//! read back.

pub mod headless;
pub mod terminal;

use std::collections::BTreeMap;

use crate::hardware::Footswitch;
use crate::menu::Menu;
use crate::session::{AnalogAssignment, Parameter, Plugin};
use crate::system::WifiStatus;

/// Toolbar affordances on hardware that has a toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Wifi,
    Bypass,
    System,
}

pub trait DisplaySink {
    fn supports_toolbar(&self) -> bool;

    /// `highlight_only` repaints the inversion without a full title redraw.
    fn draw_title(
        &mut self,
        pedalboard: &str,
        preset: Option<&str>,
        invert_pedalboard: bool,
        invert_preset: bool,
        highlight_only: bool,
    );
    fn draw_tools(&mut self, tools: &[Tool]);
    fn draw_tool_select(&mut self, tool: Tool);
    /// `enabled` means the true-bypass relay is engaged and effects are skipped.
    fn update_bypass(&mut self, enabled: bool);
    fn update_wifi(&mut self, status: &WifiStatus);
    fn draw_plugins(&mut self, plugins: &[Plugin]);
    fn draw_bound_plugins(&mut self, plugins: &[Plugin], footswitches: &[Footswitch]);
    fn draw_plugin_select(&mut self, plugin: Option<&Plugin>);
    fn draw_analog_assignments(&mut self, assignments: &BTreeMap<String, AnalogAssignment>);
    fn draw_info_message(&mut self, message: &str);
    fn draw_value_edit(&mut self, title: &str, param: &Parameter);
    fn draw_value_edit_graph(&mut self, param: &Parameter, value: f32);
    fn menu_show(&mut self, menu: &Menu);
    fn menu_highlight(&mut self, index: usize);
    fn splash_show(&mut self, boot: bool);
    fn clear_select(&mut self);
}
