use std::collections::BTreeMap;

use super::{DisplaySink, Tool};
use crate::hardware::Footswitch;
use crate::menu::Menu;
use crate::session::{AnalogAssignment, Parameter, Plugin};
use crate::system::WifiStatus;

/// Headless sink: every command becomes a debug log line.
pub struct LogDisplay {
    toolbar: bool,
}

impl LogDisplay {
    pub fn new(toolbar: bool) -> Self {
        LogDisplay { toolbar }
    }
}

impl DisplaySink for LogDisplay {
    fn supports_toolbar(&self) -> bool {
        self.toolbar
    }

    fn draw_title(
        &mut self,
        pedalboard: &str,
        preset: Option<&str>,
        invert_pedalboard: bool,
        invert_preset: bool,
        highlight_only: bool,
    ) {
        log::debug!(
            "title: {pedalboard} / {} (invert {invert_pedalboard}/{invert_preset}, highlight only {highlight_only})",
            preset.unwrap_or("-")
        );
    }

    fn draw_tools(&mut self, tools: &[Tool]) {
        log::debug!("tools: {tools:?}");
    }

    fn draw_tool_select(&mut self, tool: Tool) {
        log::debug!("tool selected: {tool:?}");
    }

    fn update_bypass(&mut self, enabled: bool) {
        log::debug!("relay enabled: {enabled}");
    }

    fn update_wifi(&mut self, status: &WifiStatus) {
        log::debug!("wifi: hotspot {}", status.hotspot_active());
    }

    fn draw_plugins(&mut self, plugins: &[Plugin]) {
        for p in plugins {
            log::debug!(
                "plugin {} [{}]{}",
                p.instance_id,
                p.category,
                if p.bypassed { " (bypassed)" } else { "" }
            );
        }
    }

    fn draw_bound_plugins(&mut self, plugins: &[Plugin], footswitches: &[Footswitch]) {
        for fs in footswitches {
            let bound = fs.binding.as_ref().and_then(|b| {
                plugins.iter().find(|p| p.controllers.contains(b))
            });
            if let Some(p) = bound {
                log::debug!("footswitch {} -> {} (led {})", fs.index + 1, p.instance_id, fs.led);
            }
        }
    }

    fn draw_plugin_select(&mut self, plugin: Option<&Plugin>) {
        log::debug!("plugin selected: {:?}", plugin.map(|p| p.instance_id.as_str()));
    }

    fn draw_analog_assignments(&mut self, assignments: &BTreeMap<String, AnalogAssignment>) {
        for (name, a) in assignments {
            log::debug!("{} -> {name}", a.controller);
        }
    }

    fn draw_info_message(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn draw_value_edit(&mut self, title: &str, param: &Parameter) {
        log::debug!(
            "{title}: {} = {} [{}, {}]",
            param.name,
            param.value,
            param.minimum,
            param.maximum
        );
    }

    fn draw_value_edit_graph(&mut self, param: &Parameter, value: f32) {
        log::debug!("{} -> {value}", param.name);
    }

    fn menu_show(&mut self, menu: &Menu) {
        log::debug!("menu '{}' ({} rows)", menu.title, menu.entries().count());
    }

    fn menu_highlight(&mut self, index: usize) {
        log::debug!("menu row {index}");
    }

    fn splash_show(&mut self, boot: bool) {
        log::debug!("splash (boot: {boot})");
    }

    fn clear_select(&mut self) {
        log::debug!("clear select");
    }
}
