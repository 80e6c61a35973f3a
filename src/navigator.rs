use std::time::Duration;

use anyhow::Context as _;

use crate::config::{self, PresetStep};
use crate::deep::{self, CommitTarget, DeepEdit, Direction, ScalarSpec};
use crate::display::{DisplaySink, Tool};
use crate::hardware::{EncoderId, Hardware, InputEvent};
use crate::menu::{self, Menu, MenuAction};
use crate::modes::{
    BottomMode, Commit, Context, Effect, EncoderEvent, StateMachine, TopMode, UniversalMode,
};
use crate::remote::{BundleReader, RemoteHost};
use crate::selection::{Selectable, SelectedType, SelectionIndex};
use crate::session::{self, Current, ParamRef, Parameter, Pedalboard};
use crate::system::{self, AudioCard, SystemControl, WifiStatus};

const TOOLS: [Tool; 3] = [Tool::Wifi, Tool::Bypass, Tool::System];

pub struct Settings {
    pub tweak_amount: f32,
    /// Wait after a hotspot toggle before re-reading wifi status.
    pub hotspot_settle: Duration,
}

/// Current mode of every encoder machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modes {
    pub top: TopMode,
    pub bottom: BottomMode,
    pub universal: UniversalMode,
}

/// Owns the session and every collaborator, and turns encoder and footswitch
/// events into remote calls and display commands.
pub struct Navigator {
    remote: Box<dyn RemoteHost>,
    bundles: Box<dyn BundleReader>,
    display: Box<dyn DisplaySink>,
    hardware: Hardware,
    audio: Box<dyn AudioCard>,
    system: Box<dyn SystemControl>,
    settings: Settings,

    library: Vec<Pedalboard>,
    current: Option<Current>,
    selection: SelectionIndex,
    deep: DeepEdit,
    menu: Menu,
    modes: Modes,
    selected_pedalboard: usize,
    selected_preset: u32,
    selected_plugin: usize,
    pending: Option<Commit>,
    wifi: WifiStatus,
    describe: Option<String>,
    exit_requested: bool,
}

fn run_machine<M: StateMachine>(mode: &mut M, event: EncoderEvent, ctx: &Context) -> Vec<Effect> {
    let t = mode.transition(event, ctx);
    if t.next != *mode {
        log::debug!("{mode:?} -> {:?}", t.next);
    }
    *mode = t.next;
    t.effects
}

impl Navigator {
    pub fn new(
        remote: Box<dyn RemoteHost>,
        bundles: Box<dyn BundleReader>,
        display: Box<dyn DisplaySink>,
        hardware: Hardware,
        audio: Box<dyn AudioCard>,
        system: Box<dyn SystemControl>,
        settings: Settings,
    ) -> Self {
        Navigator {
            remote,
            bundles,
            display,
            hardware,
            audio,
            system,
            settings,
            library: Vec::new(),
            current: None,
            selection: SelectionIndex::default(),
            deep: DeepEdit::default(),
            menu: Menu::default(),
            modes: Modes::default(),
            selected_pedalboard: 0,
            selected_preset: 0,
            selected_plugin: 0,
            pending: None,
            wifi: WifiStatus::default(),
            describe: None,
            exit_requested: false,
        }
    }

    // -----------------------------------------------------------------------
    // Startup and loop plumbing
    // -----------------------------------------------------------------------

    /// Read the host's pedalboard library. Bundles that cannot be read are skipped.
    pub fn load_pedalboards(&mut self) -> anyhow::Result<()> {
        let list = self
            .remote
            .list_pedalboards()
            .context("cannot list pedalboards")?;
        self.library.clear();
        for info in list {
            log::info!("Loading pedalboard info: {}", info.title);
            match self.bundles.load_bundle(&info.title, &info.bundle) {
                Ok(pb) => self.library.push(pb),
                Err(e) => log::warn!("Skipping pedalboard {}: {e:#}", info.title),
            }
        }
        Ok(())
    }

    /// Load the library, make the host's current pedalboard current here and
    /// read system status.
    pub fn start(&mut self) -> anyhow::Result<()> {
        self.load_pedalboards()?;
        let bundle = self.remote.current_pedalboard_bundle().unwrap_or_else(|e| {
            log::warn!("Cannot query current pedalboard: {e:#}");
            None
        });
        let pedalboard = bundle
            .and_then(|b| self.library.iter().find(|p| p.bundle == b).cloned())
            .or_else(|| self.library.first().cloned());
        match pedalboard {
            Some(pb) => self.set_current_pedalboard(pb),
            None => log::warn!("No pedalboards available"),
        }
        self.system_info_load();
        Ok(())
    }

    /// Hardware events since the last tick. Nothing is read while a load is in flight.
    pub fn poll_controls(&mut self) -> Vec<InputEvent> {
        if self.modes.universal == UniversalMode::Loading {
            return Vec::new();
        }
        self.hardware.poll_controls()
    }

    pub fn handle(&mut self, event: InputEvent) {
        let ctx = self.context();
        let effects = match event {
            InputEvent::Encoder(EncoderId::Top, ev) => run_machine(&mut self.modes.top, ev, &ctx),
            InputEvent::Encoder(EncoderId::Bottom, ev) => {
                run_machine(&mut self.modes.bottom, ev, &ctx)
            }
            InputEvent::Encoder(EncoderId::Universal, ev) => {
                run_machine(&mut self.modes.universal, ev, &ctx)
            }
            InputEvent::Footswitch(index) => {
                self.footswitch_pressed(index);
                return;
            }
            InputEvent::Quit => {
                self.exit_requested = true;
                return;
            }
        };
        for effect in effects {
            self.apply(effect);
        }
    }

    /// Run a commit deferred by entering LOADING, then return to DEFAULT.
    pub fn run_pending(&mut self) {
        let Some(commit) = self.pending.take() else {
            return;
        };
        match commit {
            Commit::Pedalboard => self.pedalboard_change(),
            Commit::Preset => self.preset_change(),
        }
        self.modes.universal = UniversalMode::Default;
        self.update_lcd_title();
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    fn context(&self) -> Context {
        Context {
            selected: self.selection.selected().map(Selectable::kind),
            has_presets: self.current.as_ref().is_some_and(|c| !c.presets.is_empty()),
            top: self.modes.top,
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::ToggleBypass => self.toggle_plugin_bypass(),
            Effect::ToggleRelay => self.system_toggle_bypass(),
            Effect::ClearSelect => self.display.clear_select(),
            Effect::SelectionAdvance(d) => self.universal_select(d),
            Effect::PluginAdvance(d) => self.plugin_select(d),
            Effect::PedalboardCandidate(d) => self.pedalboard_select(Some(d)),
            Effect::PresetCandidate(d) => self.preset_select(Some(d)),
            Effect::CommitPedalboard => self.pedalboard_change(),
            Effect::CommitPreset => self.preset_change(),
            Effect::MenuAdvance(d) => self.menu_select(d),
            Effect::MenuInvoke => self.menu_action(),
            Effect::ShowSystemMenu => self.system_menu_show(),
            Effect::ShowParameterEdit { keep_cursor } => {
                let selected = if keep_cursor { self.menu.cursor() } else { 0 };
                self.parameter_edit_show(selected);
            }
            Effect::Nudge(d, target) => self.parameter_value_change(d, target),
            Effect::RedrawHome => self.update_lcd(),
            Effect::RedrawTitle => self.update_lcd_title(),
            Effect::Defer(commit) => self.pending = Some(commit),
        }
    }

    // -----------------------------------------------------------------------
    // Pedalboards and presets
    // -----------------------------------------------------------------------

    /// Make `pedalboard` the live session: rebind hardware, fetch presets,
    /// rebuild the selection index and redraw the home screen.
    pub fn set_current_pedalboard(&mut self, pedalboard: Pedalboard) {
        let overrides = config::load_bundle_override(&pedalboard.bundle);
        self.hardware.reinit(overrides.as_ref());

        let mut current = Current::new(pedalboard);
        session::bind_current_pedalboard(&mut current, &mut self.hardware);
        match self.remote.list_presets() {
            Ok(presets) => current.set_presets(presets),
            Err(e) => log::error!("Cannot list presets: {e:#}"),
        }

        for plugin in current.pedalboard.plugins.iter().filter(|p| p.has_footswitch) {
            if let Some(index) = self.hardware.footswitch_bound_to(&plugin.controllers) {
                if let Some(fs) = self.hardware.footswitch_mut(index) {
                    fs.led = !plugin.bypassed;
                }
            }
        }

        if let Some(i) = self
            .library
            .iter()
            .position(|p| p.bundle == current.pedalboard.bundle)
        {
            self.selected_pedalboard = i;
        }
        self.selected_preset = current.preset_index;
        self.selected_plugin = 0;
        self.selection.rebuild(
            current.pedalboard.plugins.len(),
            !current.presets.is_empty(),
            self.display.supports_toolbar(),
        );
        self.deep = DeepEdit::default();
        self.current = Some(current);
        self.update_lcd();
    }

    /// Switch the host to the candidate pedalboard. The local session is
    /// rebuilt even when the host reports a failure.
    fn pedalboard_change(&mut self) {
        let Some(pedalboard) = self.library.get(self.selected_pedalboard).cloned() else {
            return;
        };
        log::info!("Pedalboard change: {}", pedalboard.title);
        self.display.draw_info_message("Loading...");
        if let Err(e) = self.remote.reset() {
            log::error!("Reset failed: {e:#}");
        }
        if let Err(e) = self.remote.load_pedalboard(&pedalboard.bundle) {
            log::error!("Loading {} failed: {e:#}", pedalboard.bundle);
        }
        self.set_current_pedalboard(pedalboard);
        self.modes.bottom = BottomMode::Default;
    }

    /// Show the next or previous pedalboard as candidate, or with `None`
    /// just mark the pedalboard field as selected.
    fn pedalboard_select(&mut self, direction: Option<Direction>) {
        let Some(current) = &self.current else {
            return;
        };
        let Some(direction) = direction else {
            self.display
                .draw_title(&current.pedalboard.title, None, true, false, false);
            return;
        };
        let len = self.library.len();
        if len == 0 {
            return;
        }
        let next = match direction {
            Direction::Forward => (self.selected_pedalboard + 1) % len,
            Direction::Backward => (self.selected_pedalboard + len - 1) % len,
        };
        let highlight_only = self.modes.universal == UniversalMode::PedalboardSelect;
        self.display
            .draw_title(&self.library[next].title, None, true, false, highlight_only);
        self.selected_pedalboard = next;
    }

    fn preset_select(&mut self, direction: Option<Direction>) {
        let Some(current) = &self.current else {
            return;
        };
        let mut index = self.selected_preset;
        if let Some(d) = direction {
            match session::next_preset_index(&current.presets, index, d.is_forward()) {
                Some(i) => index = i,
                None => return,
            }
        }
        self.selected_preset = index;
        let name = current.presets.get(&index).map(String::as_str);
        let highlight_only = self.modes.universal == UniversalMode::PresetSelect;
        self.display
            .draw_title(&current.pedalboard.title, name, false, true, highlight_only);
    }

    fn preset_change(&mut self) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if current.presets.is_empty() {
            return;
        }
        let index = self.selected_preset;
        log::info!("Preset change: {index}");
        self.display.draw_info_message("Loading...");
        if let Err(e) = self.remote.load_preset(index) {
            log::error!("Loading preset {index} failed: {e:#}");
        }
        current.preset_index = index;
        self.preset_change_plugin_update();
        self.modes.bottom = BottomMode::Default;
    }

    /// A preset load can flip bypass states on the host; read them all back.
    fn preset_change_plugin_update(&mut self) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        for plugin in &mut current.pedalboard.plugins {
            match self.remote.get_plugin_bypass(&plugin.instance_id) {
                Ok(bypassed) => plugin.bypassed = bypassed,
                Err(e) => log::error!("Cannot get bypass of {}: {e:#}", plugin.instance_id),
            }
            if plugin.has_footswitch {
                if let Some(index) = self.hardware.footswitch_bound_to(&plugin.controllers) {
                    if let Some(fs) = self.hardware.footswitch_mut(index) {
                        fs.led = !plugin.bypassed;
                    }
                }
            }
        }
        if self.display.supports_toolbar() {
            self.display.draw_tools(&TOOLS);
        }
        self.display
            .draw_analog_assignments(&current.analog_controllers);
        self.display.draw_plugins(&current.pedalboard.plugins);
        self.display
            .draw_bound_plugins(&current.pedalboard.plugins, &self.hardware.footswitches);
        self.display.draw_plugin_select(None);
    }

    fn preset_step_and_change(&mut self, step: PresetStep) {
        if self.modes.universal == UniversalMode::Loading {
            return;
        }
        self.modes.universal = UniversalMode::Loading;
        let direction = match step {
            PresetStep::Next => Direction::Forward,
            PresetStep::Previous => Direction::Backward,
        };
        self.preset_select(Some(direction));
        self.preset_change();
        self.modes.universal = UniversalMode::Default;
        self.update_lcd_title();
    }

    /// The host reports that `bundle` was loaded through another interface.
    pub fn on_external_change(&mut self, bundle: &str) {
        let Some(pedalboard) = self.library.iter().find(|p| p.bundle == bundle).cloned() else {
            log::warn!("Host switched to unknown pedalboard {bundle}");
            return;
        };
        log::info!(
            "Pedalboard changed externally from {} to {bundle}",
            self.current
                .as_ref()
                .map(|c| c.pedalboard.bundle.as_str())
                .unwrap_or("(none)")
        );
        self.display.draw_info_message("Loading...");
        self.set_current_pedalboard(pedalboard);
    }

    // -----------------------------------------------------------------------
    // Selection, plugins, footswitches
    // -----------------------------------------------------------------------

    fn universal_select(&mut self, direction: Direction) {
        if self.current.is_none() {
            return;
        }
        let Some(step) = self.selection.advance(direction) else {
            return;
        };
        if step.kind_changed() {
            match step.previous {
                SelectedType::Plugin => self.display.draw_plugin_select(None),
                SelectedType::Pedalboard | SelectedType::Preset => self.update_lcd_title(),
                SelectedType::Bypass | SelectedType::System => self.display.clear_select(),
            }
        }
        match step.current {
            Selectable::Pedalboard => self.pedalboard_select(None),
            Selectable::Preset => self.preset_select(None),
            Selectable::Plugin(i) => {
                self.selected_plugin = i;
                let plugin = self
                    .current
                    .as_ref()
                    .and_then(|c| c.pedalboard.plugins.get(i));
                self.display.draw_plugin_select(plugin);
            }
            Selectable::Bypass => self.display.draw_tool_select(Tool::Bypass),
            Selectable::System => self.display.draw_tool_select(Tool::System),
        }
    }

    fn plugin_select(&mut self, direction: Direction) {
        let Some(current) = &self.current else {
            return;
        };
        let len = current.pedalboard.plugins.len();
        if len == 0 {
            return;
        }
        self.selected_plugin = match direction {
            Direction::Forward => (self.selected_plugin + 1) % len,
            Direction::Backward => (self.selected_plugin + len - 1) % len,
        };
        self.display
            .draw_plugin_select(current.pedalboard.plugins.get(self.selected_plugin));
    }

    /// Flip bypass locally, then on the host. A host failure flips it back.
    /// Returns the resulting bypass state.
    fn toggle_bypass_of(&mut self, instance_id: &str) -> Option<bool> {
        let plugin = self.current.as_mut()?.pedalboard.plugin_mut(instance_id)?;
        let bypassed = plugin.toggle_bypass();
        if let Err(e) = self.remote.set_plugin_bypass(instance_id, bypassed) {
            log::error!("Cannot set bypass of {instance_id}: {e:#}");
            return Some(plugin.toggle_bypass());
        }
        Some(bypassed)
    }

    fn toggle_plugin_bypass(&mut self) {
        let Some(plugin) = self
            .current
            .as_ref()
            .and_then(|c| c.pedalboard.plugins.get(self.selected_plugin))
        else {
            return;
        };
        let instance_id = plugin.instance_id.clone();
        let footswitch = if plugin.has_footswitch {
            self.hardware.footswitch_bound_to(&plugin.controllers)
        } else {
            None
        };
        if let Some(index) = footswitch {
            self.footswitch_toggle(index);
            return;
        }

        self.toggle_bypass_of(&instance_id);
        if let Some(current) = &self.current {
            let plugins = &current.pedalboard.plugins;
            self.display.draw_plugins(plugins);
            self.display
                .draw_plugin_select(plugins.get(self.selected_plugin));
        }
    }

    fn footswitch_pressed(&mut self, index: usize) {
        let Some(fs) = self.hardware.footswitch(index) else {
            log::debug!("Footswitch {index} is not configured");
            return;
        };
        let (preset, relay) = (fs.preset, fs.relay);
        if let Some(step) = preset {
            self.preset_step_and_change(step);
        } else if relay {
            self.system_toggle_bypass();
        } else {
            self.footswitch_toggle(index);
        }
    }

    /// Toggle the plugin driven by footswitch `index` and mirror it on the LED.
    fn footswitch_toggle(&mut self, index: usize) {
        let Some(target) = self.hardware.footswitch_parameter(index).cloned() else {
            log::debug!("Footswitch {index} is not bound to a plugin");
            return;
        };
        let Some(bypassed) = self.toggle_bypass_of(&target.instance_id) else {
            return;
        };
        if let Some(fs) = self.hardware.footswitch_mut(index) {
            fs.led = !bypassed;
        }
        if let Some(current) = &self.current {
            self.display
                .draw_bound_plugins(&current.pedalboard.plugins, &self.hardware.footswitches);
        }
    }

    /// Toggle the true-bypass relay. A relay footswitch's LED follows it.
    fn system_toggle_bypass(&mut self) {
        let relay = &mut self.hardware.relay;
        if relay.enabled {
            relay.disable();
        } else {
            relay.enable();
        }
        let enabled = relay.enabled;
        self.display.update_bypass(enabled);
        if let Some(index) = self.hardware.relay_footswitch() {
            if let Some(fs) = self.hardware.footswitch_mut(index) {
                fs.led = !enabled;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Menus
    // -----------------------------------------------------------------------

    fn show_menu(&mut self) {
        self.display.menu_show(&self.menu);
        self.display.menu_highlight(self.menu.cursor());
    }

    fn menu_select(&mut self, direction: Direction) {
        let index = self.menu.advance(direction);
        self.display.menu_highlight(index);
    }

    fn menu_action(&mut self) {
        match self.menu.action() {
            Some(action) => self.run_action(action),
            None => log::debug!("No action at menu row {}", self.menu.cursor()),
        }
    }

    fn menu_back(&mut self) {
        self.modes = Modes::default();
        self.update_lcd();
    }

    fn run_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::Back => self.menu_back(),
            MenuAction::Shutdown => {
                self.display.splash_show(false);
                log::info!("System shutdown");
                if let Err(e) = self.system.shutdown() {
                    log::error!("Shutdown failed: {e:#}");
                }
            }
            MenuAction::Reboot => {
                self.display.splash_show(false);
                log::info!("System reboot");
                if let Err(e) = self.system.reboot() {
                    log::error!("Reboot failed: {e:#}");
                }
            }
            MenuAction::SystemInfo => self.system_info_show(),
            MenuAction::SavePedalboard => self.save_current_pedalboard(),
            MenuAction::Reload => {
                log::info!("Exiting main loop, the service manager restarts us");
                self.exit_requested = true;
            }
            MenuAction::RestartSoundEngine => {
                self.display.splash_show(true);
                log::info!("Restart sound engine");
                if let Err(e) = self.system.restart_audio() {
                    log::error!("Sound engine restart failed: {e:#}");
                }
            }
            MenuAction::InputGain => {
                self.modes.top = TopMode::InputGain;
                self.modes.universal = UniversalMode::InputGain;
                let control = self.audio.capture_control().to_string();
                self.system_menu_parameter(&deep::INPUT_GAIN, &control);
            }
            MenuAction::HeadphoneVolume => {
                self.modes.top = TopMode::HeadphoneVolume;
                self.modes.universal = UniversalMode::HeadphoneVolume;
                let control = self.audio.master_control().to_string();
                self.system_menu_parameter(&deep::HEADPHONE_VOLUME, &control);
            }
            MenuAction::EnableHotspot => self.system_toggle_hotspot(true),
            MenuAction::DisableHotspot => self.system_toggle_hotspot(false),
            MenuAction::ShowValue => self.parameter_value_show(),
        }
    }

    fn system_menu_show(&mut self) {
        self.menu = menu::system_menu();
        self.show_menu();
    }

    fn save_current_pedalboard(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        let title = &current.pedalboard.title;
        match self.remote.save_pedalboard(title) {
            Ok(()) => log::info!("Saved pedalboard {title}"),
            Err(e) => log::error!("Saving {title} failed: {e:#}"),
        }
    }

    // -----------------------------------------------------------------------
    // System info
    // -----------------------------------------------------------------------

    pub fn system_info_load(&mut self) {
        match self.system.wifi_status() {
            Ok(status) => {
                self.wifi = status;
                self.display.update_wifi(&self.wifi);
            }
            Err(e) => log::warn!("Cannot read wifi status: {e:#}"),
        }
        match self.system.software_version() {
            Ok(describe) => {
                log::info!("Software version {}", system::version_from_describe(&describe));
                self.describe = Some(describe);
            }
            Err(e) => log::error!("Cannot obtain software version: {e:#}"),
        }
    }

    fn system_info_show(&mut self) {
        self.menu = menu::system_info_menu(self.describe.as_deref(), &self.wifi);
        self.show_menu();
    }

    fn system_toggle_hotspot(&mut self, enable: bool) {
        self.display.draw_info_message(if enable {
            "Enabling, please wait..."
        } else {
            "Disabling, please wait..."
        });
        if let Err(e) = self.system.set_hotspot(enable) {
            log::error!("Hotspot toggle failed: {e:#}");
        }
        std::thread::sleep(self.settings.hotspot_settle);
        self.system_info_load();
        self.system_info_show();
    }

    // -----------------------------------------------------------------------
    // Parameter editing
    // -----------------------------------------------------------------------

    fn system_menu_parameter(&mut self, spec: &ScalarSpec, control: &str) {
        let value = self.audio.get_parameter(control).unwrap_or_else(|e| {
            log::error!("Cannot read {control}: {e:#}");
            0.0
        });
        let param = spec.parameter(value.clamp(spec.minimum, spec.maximum));
        self.display.draw_value_edit(spec.title, &param);
        self.display.draw_info_message(spec.title);
        self.deep = DeepEdit::for_scalar(param);
    }

    /// Show the parameter pick-list of the selected plugin with row `selected`
    /// highlighted.
    fn parameter_edit_show(&mut self, selected: usize) {
        let Some(plugin) = self
            .current
            .as_ref()
            .and_then(|c| c.pedalboard.plugins.get(self.selected_plugin))
        else {
            log::debug!("No plugin to edit");
            self.menu_back();
            return;
        };
        self.deep = DeepEdit::for_plugin(plugin);
        self.menu = menu::parameter_menu(&plugin.instance_id, &self.deep.parameters);
        self.menu.set_cursor(selected);
        self.show_menu();
    }

    fn parameter_value_show(&mut self) {
        let Some(param) = self.menu.selected().and_then(|i| i.parameter.clone()) else {
            return;
        };
        self.modes.bottom = BottomMode::ValueEdit;
        self.modes.universal = UniversalMode::ValueEdit;
        let title = self.deep.plugin.clone().unwrap_or_default();
        self.display.draw_value_edit(&title, &param);
        self.deep.selected_index = self.menu.cursor();
        self.deep.selected = Some(param);
    }

    /// Nudge the value being edited one step. The new value is stored before
    /// it is committed; an unchanged value commits and redraws nothing.
    fn parameter_value_change(&mut self, direction: Direction, target: CommitTarget) {
        let Some(param) = self.deep.selected.as_mut() else {
            return;
        };
        let Some(value) = deep::nudge(param, direction, self.settings.tweak_amount) else {
            return;
        };
        param.value = value;
        let param = param.clone();
        match target {
            CommitTarget::PluginParameter => self.parameter_value_commit(&param),
            CommitTarget::InputGain => {
                let control = self.audio.capture_control().to_string();
                self.audio_commit(&control, value);
            }
            CommitTarget::HeadphoneVolume => {
                let control = self.audio.master_control().to_string();
                self.audio_commit(&control, value);
            }
        }
        self.display.draw_value_edit_graph(&param, value);
    }

    fn parameter_value_commit(&mut self, param: &Parameter) {
        let Some(instance_id) = self.deep.plugin.clone() else {
            return;
        };
        if let Err(e) = self
            .remote
            .set_parameter(&instance_id, &param.symbol, param.value)
        {
            log::error!("Cannot set {instance_id}:{}: {e:#}", param.symbol);
        }
        let target = ParamRef {
            instance_id,
            symbol: param.symbol.clone(),
        };
        if let Some(p) = self.current.as_mut().and_then(|c| c.parameter_mut(&target)) {
            p.value = param.value;
        }
        for controller in self.hardware.controllers.values_mut() {
            if controller.parameter.as_ref() == Some(&target) {
                controller.value = param.value;
            }
        }
    }

    fn audio_commit(&mut self, control: &str, value: f32) {
        if let Err(e) = self.audio.set_parameter(control, value) {
            log::error!("Cannot set {control}: {e:#}");
        }
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    /// Redraw the whole home screen.
    fn update_lcd(&mut self) {
        if self.display.supports_toolbar() {
            self.display.draw_tools(&TOOLS);
        }
        self.display.update_bypass(self.hardware.relay.enabled);
        self.update_lcd_title();
        let Some(current) = &self.current else {
            return;
        };
        self.display
            .draw_analog_assignments(&current.analog_controllers);
        self.display.draw_plugins(&current.pedalboard.plugins);
        self.display
            .draw_bound_plugins(&current.pedalboard.plugins, &self.hardware.footswitches);
        self.display.draw_plugin_select(None);
    }

    fn update_lcd_title(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        let invert_pedalboard = self.modes.top == TopMode::PedalboardSelect
            || self.modes.universal == UniversalMode::PedalboardSelect;
        let invert_preset = self.modes.top == TopMode::PresetSelect
            || self.modes.universal == UniversalMode::PresetSelect;
        let highlight_only = matches!(
            self.modes.universal,
            UniversalMode::PedalboardSelect | UniversalMode::PresetSelect
        );
        self.display.draw_title(
            &current.pedalboard.title,
            current.preset_name(),
            invert_pedalboard,
            invert_preset,
            highlight_only,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use crate::config::{ControllerConfig, FootswitchConfig, HardwareConfig};
    use crate::hardware::{ControllerKind, Footswitch};
    use crate::remote::PedalboardInfo;
    use crate::session::{AnalogAssignment, Plugin, BYPASS_SYMBOL};
    use crate::system::{MemoryCard, NullSystem};

    type Log = Rc<RefCell<Vec<String>>>;

    const A: &str = "/pb/a";
    const B: &str = "/pb/b";

    #[derive(Default)]
    struct HostState {
        calls: Vec<String>,
        current: Option<String>,
        /// Bypass states reported after a preset load.
        bypass: BTreeMap<String, bool>,
        fail_bypass: bool,
    }

    #[derive(Clone, Default)]
    struct FakeHost(Rc<RefCell<HostState>>);

    impl FakeHost {
        fn calls(&self) -> Vec<String> {
            self.0.borrow().calls.clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn record(&self, call: String) {
            self.0.borrow_mut().calls.push(call);
        }
    }

    impl RemoteHost for FakeHost {
        fn list_pedalboards(&mut self) -> anyhow::Result<Vec<PedalboardInfo>> {
            Ok(vec![
                PedalboardInfo { title: "Alpha".into(), bundle: A.into() },
                PedalboardInfo { title: "Bravo".into(), bundle: B.into() },
            ])
        }

        fn current_pedalboard_bundle(&mut self) -> anyhow::Result<Option<String>> {
            Ok(self.0.borrow().current.clone())
        }

        fn reset(&mut self) -> anyhow::Result<()> {
            self.record("reset".into());
            Ok(())
        }

        fn load_pedalboard(&mut self, bundle: &str) -> anyhow::Result<()> {
            self.record(format!("load_pedalboard:{bundle}"));
            self.0.borrow_mut().current = Some(bundle.to_string());
            Ok(())
        }

        fn save_pedalboard(&mut self, title: &str) -> anyhow::Result<()> {
            self.record(format!("save:{title}"));
            Ok(())
        }

        fn list_presets(&mut self) -> anyhow::Result<BTreeMap<u32, String>> {
            if self.0.borrow().current.as_deref() == Some(A) {
                Ok(BTreeMap::from([(0, "Clean".into()), (1, "Lead".into())]))
            } else {
                Ok(BTreeMap::new())
            }
        }

        fn load_preset(&mut self, index: u32) -> anyhow::Result<()> {
            self.record(format!("load_preset:{index}"));
            Ok(())
        }

        fn get_plugin_bypass(&mut self, instance_id: &str) -> anyhow::Result<bool> {
            Ok(self.0.borrow().bypass.get(instance_id).copied().unwrap_or(false))
        }

        fn set_plugin_bypass(&mut self, instance_id: &str, bypassed: bool) -> anyhow::Result<()> {
            self.record(format!("bypass:{instance_id}:{bypassed}"));
            if self.0.borrow().fail_bypass {
                anyhow::bail!("status 500");
            }
            Ok(())
        }

        fn get_parameter(&mut self, _instance_id: &str, _symbol: &str) -> anyhow::Result<f32> {
            Ok(0.0)
        }

        fn set_parameter(&mut self, instance_id: &str, symbol: &str, value: f32) -> anyhow::Result<()> {
            self.record(format!("set:{instance_id}:{symbol}:{value}"));
            Ok(())
        }
    }

    struct FakeBundles;

    impl BundleReader for FakeBundles {
        fn load_bundle(&self, title: &str, bundle: &str) -> anyhow::Result<Pedalboard> {
            let plugins = match bundle {
                A => vec![
                    Plugin::new("drive", "Distortion").with_parameter(
                        Parameter::new(BYPASS_SYMBOL, "bypass", 0.0, 0.0, 1.0).with_binding("fs1"),
                    ),
                    Plugin::new("fuzz", "Distortion")
                        .with_parameter(Parameter::new("gain", "Gain", 1.0, 0.0, 1.0)),
                    Plugin::new("delay", "Delay"),
                ],
                B => vec![Plugin::new("reverb", "Reverb")
                    .with_parameter(Parameter::new("mix", "Mix", 0.3, 0.0, 1.0))],
                _ => anyhow::bail!("unknown bundle"),
            };
            Ok(Pedalboard::new(title, bundle, plugins))
        }
    }

    struct RecordingDisplay {
        log: Log,
        toolbar: bool,
    }

    impl RecordingDisplay {
        fn push(&self, entry: String) {
            self.log.borrow_mut().push(entry);
        }
    }

    impl DisplaySink for RecordingDisplay {
        fn supports_toolbar(&self) -> bool {
            self.toolbar
        }

        fn draw_title(&mut self, pb: &str, preset: Option<&str>, ipb: bool, ipre: bool, _h: bool) {
            self.push(format!("title:{pb}:{}:{ipb}:{ipre}", preset.unwrap_or("-")));
        }

        fn draw_tools(&mut self, _tools: &[Tool]) {
            self.push("tools".into());
        }

        fn draw_tool_select(&mut self, tool: Tool) {
            self.push(format!("tool_select:{tool:?}"));
        }

        fn update_bypass(&mut self, enabled: bool) {
            self.push(format!("relay:{enabled}"));
        }

        fn update_wifi(&mut self, _status: &WifiStatus) {
            self.push("wifi".into());
        }

        fn draw_plugins(&mut self, plugins: &[Plugin]) {
            self.push(format!("plugins:{}", plugins.len()));
        }

        fn draw_bound_plugins(&mut self, _plugins: &[Plugin], _footswitches: &[Footswitch]) {
            self.push("bound".into());
        }

        fn draw_plugin_select(&mut self, plugin: Option<&Plugin>) {
            self.push(format!(
                "plugin_select:{}",
                plugin.map(|p| p.instance_id.as_str()).unwrap_or("-")
            ));
        }

        fn draw_analog_assignments(&mut self, _a: &BTreeMap<String, AnalogAssignment>) {
            self.push("analog".into());
        }

        fn draw_info_message(&mut self, message: &str) {
            self.push(format!("info:{message}"));
        }

        fn draw_value_edit(&mut self, title: &str, param: &Parameter) {
            self.push(format!("value:{title}:{}", param.symbol));
        }

        fn draw_value_edit_graph(&mut self, param: &Parameter, value: f32) {
            self.push(format!("graph:{}:{value}", param.symbol));
        }

        fn menu_show(&mut self, menu: &Menu) {
            self.push(format!("menu:{}", menu.title));
        }

        fn menu_highlight(&mut self, index: usize) {
            self.push(format!("highlight:{index}"));
        }

        fn splash_show(&mut self, boot: bool) {
            self.push(format!("splash:{boot}"));
        }

        fn clear_select(&mut self) {
            self.push("clear_select".into());
        }
    }

    struct Rig {
        nav: Navigator,
        host: FakeHost,
        screen: Log,
    }

    impl Rig {
        fn new(toolbar: bool) -> Self {
            let host = FakeHost::default();
            host.0.borrow_mut().current = Some(A.into());
            let screen = Log::default();
            let hardware = Hardware::new(HardwareConfig {
                controllers: vec![ControllerConfig::new("fs1", ControllerKind::Footswitch, "FS1")],
                footswitches: vec![
                    FootswitchConfig::bound(0, "fs1"),
                    FootswitchConfig {
                        index: 1,
                        binding: None,
                        relay: false,
                        preset: Some(PresetStep::Next),
                    },
                    FootswitchConfig {
                        index: 2,
                        binding: None,
                        relay: true,
                        preset: None,
                    },
                ],
            });
            let mut nav = Navigator::new(
                Box::new(host.clone()),
                Box::new(FakeBundles),
                Box::new(RecordingDisplay {
                    log: screen.clone(),
                    toolbar,
                }),
                hardware,
                Box::new(MemoryCard::default()),
                Box::new(NullSystem::default()),
                Settings {
                    tweak_amount: 8.0,
                    hotspot_settle: Duration::ZERO,
                },
            );
            nav.start().unwrap();
            Rig { nav, host, screen }
        }

        fn universal(&mut self, event: EncoderEvent) {
            self.nav
                .handle(InputEvent::Encoder(EncoderId::Universal, event));
        }

        fn top(&mut self, event: EncoderEvent) {
            self.nav.handle(InputEvent::Encoder(EncoderId::Top, event));
        }

        fn bottom(&mut self, event: EncoderEvent) {
            self.nav.handle(InputEvent::Encoder(EncoderId::Bottom, event));
        }

        fn screen_has(&self, entry: &str) -> bool {
            self.screen.borrow().iter().any(|e| e == entry)
        }

        fn plugin(&self, id: &str) -> &Plugin {
            self.nav
                .current
                .as_ref()
                .and_then(|c| c.pedalboard.plugin(id))
                .unwrap()
        }
    }

    const FWD: EncoderEvent = EncoderEvent::Rotate(Direction::Forward);
    const BACK: EncoderEvent = EncoderEvent::Rotate(Direction::Backward);
    const PRESS: EncoderEvent = EncoderEvent::Released;
    const LONG: EncoderEvent = EncoderEvent::LongPressed;

    #[test]
    fn start_binds_current_pedalboard() {
        let rig = Rig::new(true);
        let current = rig.nav.current.as_ref().unwrap();
        assert_eq!(current.pedalboard.bundle, A);
        assert_eq!(current.preset_index, 0);
        let order: Vec<_> = current
            .pedalboard
            .plugins
            .iter()
            .map(|p| p.instance_id.as_str())
            .collect();
        assert_eq!(order, ["fuzz", "delay", "drive"]);
        // pedalboard, preset, three plugins, bypass and system tools
        assert_eq!(rig.nav.selection.items().len(), 7);
        assert_eq!(rig.nav.selection.cursor(), 0);
        assert!(rig.nav.hardware.footswitch(0).unwrap().led);
        assert!(rig.screen_has("title:Alpha:Clean:false:false"));
        assert!(rig.screen_has("tools"));
    }

    #[test]
    fn switching_to_smaller_pedalboard_rebuilds_selection() {
        let mut rig = Rig::new(false);
        assert_eq!(rig.nav.selection.items().len(), 5);

        rig.universal(PRESS);
        assert_eq!(rig.nav.modes.universal, UniversalMode::Scroll);
        rig.universal(PRESS);
        assert_eq!(rig.nav.modes.universal, UniversalMode::PedalboardSelect);
        assert!(rig.screen_has("title:Alpha:Clean:true:false"));
        rig.universal(FWD);
        assert!(rig.screen_has("title:Bravo:-:true:false"));
        rig.universal(PRESS);
        assert_eq!(rig.nav.modes.universal, UniversalMode::Loading);
        assert_eq!(rig.nav.pending, Some(Commit::Pedalboard));

        rig.nav.run_pending();
        assert_eq!(rig.nav.modes.universal, UniversalMode::Default);
        assert_eq!(rig.nav.current.as_ref().unwrap().pedalboard.bundle, B);
        assert_eq!(rig.nav.selection.items().len(), 2);
        assert_eq!(rig.nav.selection.cursor(), 0);
        assert_eq!(
            rig.nav.selection.items(),
            [Selectable::Pedalboard, Selectable::Plugin(0)]
        );
        let calls = rig.host.calls();
        assert!(calls.contains(&"reset".to_string()));
        assert!(calls.contains(&format!("load_pedalboard:{B}")));
    }

    #[test]
    fn loading_ignores_rotation_until_commit_completes() {
        let mut rig = Rig::new(false);
        rig.universal(PRESS);
        rig.universal(PRESS);
        rig.universal(FWD);
        rig.universal(PRESS);
        assert_eq!(rig.nav.modes.universal, UniversalMode::Loading);

        for event in [FWD, FWD, BACK, LONG] {
            rig.universal(event);
        }
        assert_eq!(rig.nav.modes.universal, UniversalMode::Loading);
        assert_eq!(rig.nav.selection.cursor(), 0);
        assert_eq!(rig.nav.pending, Some(Commit::Pedalboard));
        assert!(rig.nav.poll_controls().is_empty());

        rig.nav.run_pending();
        rig.universal(FWD);
        assert_eq!(rig.nav.modes.universal, UniversalMode::Scroll);
        assert_eq!(rig.nav.selection.cursor(), 1);
    }

    #[test]
    fn scrolling_marks_kinds_and_clears_previous() {
        let mut rig = Rig::new(true);
        rig.universal(FWD);
        assert!(rig.screen_has("title:Alpha:Clean:false:true"));
        rig.universal(FWD);
        assert!(rig.screen_has("plugin_select:fuzz"));
        rig.universal(BACK);
        assert!(rig.screen_has("plugin_select:-"));
        for _ in 0..5 {
            rig.universal(BACK);
        }
        assert_eq!(rig.nav.selection.cursor(), 3);
        rig.screen.borrow_mut().clear();
        // delay -> drive -> bypass tool
        rig.universal(FWD);
        rig.universal(FWD);
        assert!(rig.screen_has("plugin_select:-"));
        assert!(rig.screen_has("tool_select:Bypass"));
        rig.universal(PRESS);
        assert!(rig.screen_has("relay:true"));
        assert!(rig.nav.hardware.relay.enabled);
    }

    #[test]
    fn failed_bypass_rolls_back() {
        let mut rig = Rig::new(false);
        rig.host.0.borrow_mut().fail_bypass = true;
        rig.universal(PRESS);
        rig.universal(FWD);
        rig.universal(FWD);
        assert_eq!(rig.nav.selection.selected(), Some(Selectable::Plugin(0)));

        rig.universal(PRESS);
        assert_eq!(rig.host.count("bypass:fuzz:true"), 1);
        assert!(!rig.plugin("fuzz").bypassed);

        rig.host.0.borrow_mut().fail_bypass = false;
        rig.universal(PRESS);
        assert!(rig.plugin("fuzz").bypassed);
    }

    #[test]
    fn footswitch_toggles_bound_plugin_and_led() {
        let mut rig = Rig::new(false);
        rig.nav.handle(InputEvent::Footswitch(0));
        assert!(rig.plugin("drive").bypassed);
        assert!(!rig.nav.hardware.footswitch(0).unwrap().led);
        assert!(rig.screen_has("bound"));

        // selecting the footswitch plugin and pressing goes through the footswitch
        rig.bottom(BACK);
        assert!(rig.screen_has("plugin_select:drive"));
        rig.bottom(PRESS);
        assert!(!rig.plugin("drive").bypassed);
        assert!(rig.nav.hardware.footswitch(0).unwrap().led);
        assert_eq!(rig.host.count("bypass:drive"), 2);
    }

    #[test]
    fn relay_footswitch_mirrors_relay() {
        let mut rig = Rig::new(false);
        assert!(!rig.nav.hardware.relay.enabled);
        rig.nav.handle(InputEvent::Footswitch(2));
        assert!(rig.nav.hardware.relay.enabled);
        assert!(!rig.nav.hardware.footswitch(2).unwrap().led);
        rig.nav.handle(InputEvent::Footswitch(2));
        assert!(rig.nav.hardware.footswitch(2).unwrap().led);
        rig.nav.handle(InputEvent::Footswitch(7));
        assert!(!rig.nav.hardware.relay.enabled);
    }

    #[test]
    fn preset_footswitch_steps_and_loads() {
        let mut rig = Rig::new(false);
        rig.host.0.borrow_mut().bypass.insert("delay".into(), true);
        rig.nav.handle(InputEvent::Footswitch(1));
        assert_eq!(rig.host.count("load_preset:1"), 1);
        assert_eq!(rig.nav.current.as_ref().unwrap().preset_index, 1);
        assert!(rig.plugin("delay").bypassed);
        assert_eq!(rig.nav.modes.universal, UniversalMode::Default);
        rig.nav.handle(InputEvent::Footswitch(1));
        assert_eq!(rig.nav.current.as_ref().unwrap().preset_index, 0);
    }

    #[test]
    fn preset_change_resyncs_bypass() {
        let mut rig = Rig::new(false);
        rig.host.0.borrow_mut().bypass.insert("fuzz".into(), true);
        rig.universal(PRESS);
        rig.universal(FWD);
        rig.universal(PRESS);
        assert_eq!(rig.nav.modes.universal, UniversalMode::PresetSelect);
        rig.universal(FWD);
        assert!(rig.screen_has("title:Alpha:Lead:false:true"));
        rig.universal(PRESS);
        assert_eq!(rig.nav.pending, Some(Commit::Preset));
        rig.nav.run_pending();

        assert_eq!(rig.host.count("load_preset:1"), 1);
        assert_eq!(rig.nav.current.as_ref().unwrap().preset_index, 1);
        assert!(rig.plugin("fuzz").bypassed);
        assert!(!rig.plugin("delay").bypassed);
        assert!(rig.screen_has("title:Alpha:Lead:false:false"));
    }

    #[test]
    fn value_edit_commits_only_changes() {
        let mut rig = Rig::new(false);
        rig.universal(PRESS);
        rig.universal(FWD);
        rig.universal(FWD);
        rig.universal(LONG);
        assert_eq!(rig.nav.modes.universal, UniversalMode::DeepEdit);
        assert!(rig.screen_has("menu:fuzz"));

        rig.universal(FWD);
        assert_eq!(rig.nav.menu.cursor(), 1);
        rig.universal(PRESS);
        assert_eq!(rig.nav.modes.universal, UniversalMode::ValueEdit);
        assert!(rig.screen_has("value:fuzz:gain"));

        // already at maximum
        rig.universal(FWD);
        assert_eq!(rig.host.count("set:"), 0);
        assert!(!rig.screen.borrow().iter().any(|e| e.starts_with("graph:")));

        rig.universal(BACK);
        assert_eq!(rig.host.calls().last().unwrap(), "set:fuzz:gain:0.94");
        assert!(rig.screen_has("graph:gain:0.94"));
        let gain = &rig.plugin("fuzz").parameters["gain"];
        assert_eq!(gain.value, 0.94);

        rig.universal(PRESS);
        assert_eq!(rig.nav.modes.universal, UniversalMode::DeepEdit);
        assert_eq!(rig.nav.menu.cursor(), 1);
        let shown = rig.nav.menu.selected().and_then(|i| i.parameter.clone()).unwrap();
        assert_eq!(shown.value, 0.94);
    }

    #[test]
    fn bottom_encoder_is_ignored_in_system_menu() {
        let mut rig = Rig::new(false);
        rig.top(LONG);
        assert_eq!(rig.nav.modes.top, TopMode::SystemMenu);
        assert!(rig.screen_has("menu:System menu"));

        rig.bottom(PRESS);
        rig.bottom(FWD);
        rig.bottom(LONG);
        assert_eq!(rig.host.count("bypass:"), 0);
        assert_eq!(rig.nav.modes.bottom, BottomMode::Default);
        assert_eq!(rig.nav.menu.title, "System menu");

        rig.top(LONG);
        assert_eq!(rig.nav.modes.top, TopMode::Default);
        rig.bottom(FWD);
        assert!(rig.screen_has("plugin_select:delay"));
    }

    #[test]
    fn input_gain_through_system_menu() {
        let mut rig = Rig::new(false);
        rig.top(LONG);
        for _ in 0..7 {
            rig.top(FWD);
        }
        rig.top(PRESS);
        assert_eq!(rig.nav.modes.top, TopMode::InputGain);
        assert!(rig.screen_has("value:Input Gain:igain"));

        rig.top(FWD);
        assert_eq!(rig.nav.deep.selected.as_ref().unwrap().value, 2.0);
        rig.top(PRESS);
        assert_eq!(rig.nav.modes.top, TopMode::SystemMenu);
        assert_eq!(rig.nav.menu.cursor(), 0);
    }

    #[test]
    fn top_encoder_commits_pedalboard() {
        let mut rig = Rig::new(false);
        rig.top(PRESS);
        assert_eq!(rig.nav.modes.top, TopMode::PresetSelect);
        rig.top(PRESS);
        assert_eq!(rig.nav.modes.top, TopMode::PedalboardSelect);
        rig.top(FWD);
        assert_eq!(rig.nav.modes.top, TopMode::PedalboardSelected);
        rig.top(PRESS);
        assert_eq!(rig.nav.modes.top, TopMode::Default);
        assert_eq!(rig.nav.current.as_ref().unwrap().pedalboard.bundle, B);
    }

    #[test]
    fn menu_back_and_reload() {
        let mut rig = Rig::new(false);
        rig.universal(LONG);
        assert_eq!(rig.nav.modes.universal, UniversalMode::SystemMenu);
        rig.universal(PRESS);
        assert_eq!(rig.nav.modes, Modes::default());

        rig.universal(LONG);
        for _ in 0..5 {
            rig.universal(FWD);
        }
        rig.universal(PRESS);
        assert!(rig.nav.exit_requested());
    }

    #[test]
    fn system_info_hotspot_toggle() {
        let mut rig = Rig::new(false);
        rig.universal(LONG);
        for _ in 0..3 {
            rig.universal(FWD);
        }
        rig.universal(PRESS);
        assert_eq!(rig.nav.menu.title, "System Info");
        assert!(rig.nav.menu.entries().any(|(_, i)| i.action == Some(MenuAction::EnableHotspot)));

        // Back, then Enable Hotspot
        rig.universal(FWD);
        rig.universal(PRESS);
        assert!(rig.screen_has("info:Enabling, please wait..."));
        assert!(rig.nav.menu.entries().any(|(_, i)| i.action == Some(MenuAction::DisableHotspot)));
    }

    #[test]
    fn save_overwrites_current_title() {
        let mut rig = Rig::new(false);
        rig.universal(LONG);
        for _ in 0..4 {
            rig.universal(FWD);
        }
        rig.universal(PRESS);
        assert_eq!(rig.host.count("save:Alpha"), 1);
    }

    #[test]
    fn external_change_switches_known_bundles_only() {
        let mut rig = Rig::new(false);
        rig.nav.on_external_change("/pb/unknown");
        assert_eq!(rig.nav.current.as_ref().unwrap().pedalboard.bundle, A);
        rig.host.0.borrow_mut().current = Some(B.into());
        rig.nav.on_external_change(B);
        assert_eq!(rig.nav.current.as_ref().unwrap().pedalboard.bundle, B);
        assert!(rig.nav.current.as_ref().unwrap().presets.is_empty());
    }
}
