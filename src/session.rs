use std::collections::BTreeMap;
use std::ops::Bound;

use crate::hardware::{ControllerKind, Hardware};

/// Symbol of the host-provided bypass port. Never shown in the parameter pick-list.
pub const BYPASS_SYMBOL: &str = ":bypass";

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub symbol: String,
    pub name: String,
    pub value: f32,
    pub minimum: f32,
    pub maximum: f32,
    /// Controller key (e.g. `"0:64"`) this parameter is mapped to, if any.
    pub binding: Option<String>,
}

impl Parameter {
    pub fn new(symbol: &str, name: &str, value: f32, minimum: f32, maximum: f32) -> Self {
        Parameter {
            symbol: symbol.to_string(),
            name: name.to_string(),
            value,
            minimum,
            maximum,
            binding: None,
        }
    }

    pub fn with_binding(mut self, key: &str) -> Self {
        self.binding = Some(key.to_string());
        self
    }
}

/// Names one parameter of one plugin instance in the current pedalboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRef {
    pub instance_id: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub instance_id: String,
    pub category: String,
    /// Ordered by symbol.
    pub parameters: BTreeMap<String, Parameter>,
    pub bypassed: bool,
    /// Keys of the hardware controllers bound to this plugin's parameters.
    pub controllers: Vec<String>,
    pub has_footswitch: bool,
}

impl Plugin {
    pub fn new(instance_id: &str, category: &str) -> Self {
        Plugin {
            instance_id: instance_id.to_string(),
            category: category.to_string(),
            parameters: BTreeMap::new(),
            bypassed: false,
            controllers: Vec::new(),
            has_footswitch: false,
        }
    }

    pub fn with_parameter(mut self, param: Parameter) -> Self {
        self.parameters.insert(param.symbol.clone(), param);
        self
    }

    /// Flip the bypass flag and return the new value.
    pub fn toggle_bypass(&mut self) -> bool {
        self.bypassed = !self.bypassed;
        self.bypassed
    }

    /// Parameters offered for editing, in display order.
    pub fn editable_parameters(&self) -> Vec<Parameter> {
        self.parameters
            .values()
            .filter(|p| p.symbol != BYPASS_SYMBOL)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pedalboard {
    pub title: String,
    pub bundle: String,
    pub plugins: Vec<Plugin>,
}

impl Pedalboard {
    pub fn new(title: &str, bundle: &str, plugins: Vec<Plugin>) -> Self {
        Pedalboard {
            title: title.to_string(),
            bundle: bundle.to_string(),
            plugins,
        }
    }

    pub fn plugin(&self, instance_id: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.instance_id == instance_id)
    }

    pub fn plugin_mut(&mut self, instance_id: &str) -> Option<&mut Plugin> {
        self.plugins.iter_mut().find(|p| p.instance_id == instance_id)
    }
}

/// What an analog controller is driving, shown on the home screen.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalogAssignment {
    pub controller: String,
    pub kind: ControllerKind,
    pub category: String,
}

/// Live state derived from whichever pedalboard the host says is current.
///
/// Replaced wholesale on every pedalboard switch.
#[derive(Debug)]
pub struct Current {
    pub pedalboard: Pedalboard,
    /// Sparse: a deleted preset leaves a hole in the indices.
    pub presets: BTreeMap<u32, String>,
    pub preset_index: u32,
    /// `"<instance>:<parameter name>"` → assignment.
    pub analog_controllers: BTreeMap<String, AnalogAssignment>,
}

impl Current {
    pub fn new(pedalboard: Pedalboard) -> Self {
        Current {
            pedalboard,
            presets: BTreeMap::new(),
            preset_index: 0,
            analog_controllers: BTreeMap::new(),
        }
    }

    pub fn set_presets(&mut self, presets: BTreeMap<u32, String>) {
        self.preset_index = presets.keys().next().copied().unwrap_or(0);
        self.presets = presets;
    }

    pub fn preset_name(&self) -> Option<&str> {
        self.presets.get(&self.preset_index).map(String::as_str)
    }

    pub fn parameter_mut(&mut self, target: &ParamRef) -> Option<&mut Parameter> {
        self.pedalboard
            .plugin_mut(&target.instance_id)?
            .parameters
            .get_mut(&target.symbol)
    }
}

/// Attach hardware controllers to the parameters of the current pedalboard.
///
/// A parameter whose binding names no known controller is skipped. When two
/// parameters name the same controller the later one wins. Footswitch-bound
/// plugins are moved to the tail of the plugin list, keeping their order.
pub fn bind_current_pedalboard(current: &mut Current, hardware: &mut Hardware) {
    for plugin in current.pedalboard.plugins.iter_mut() {
        for param in plugin.parameters.values() {
            let Some(key) = param.binding.as_deref() else {
                continue;
            };
            let Some(controller) = hardware.controllers.get_mut(key) else {
                log::debug!("No controller for binding {key} ({})", plugin.instance_id);
                continue;
            };
            controller.parameter = Some(ParamRef {
                instance_id: plugin.instance_id.clone(),
                symbol: param.symbol.clone(),
            });
            controller.value = param.value;
            if !plugin.controllers.iter().any(|k| k == key) {
                plugin.controllers.push(key.to_string());
            }
            match controller.kind {
                ControllerKind::Footswitch => plugin.has_footswitch = true,
                ControllerKind::Analog => {
                    current.analog_controllers.insert(
                        format!("{}:{}", plugin.instance_id, param.name),
                        AnalogAssignment {
                            controller: controller.name.clone(),
                            kind: controller.kind,
                            category: plugin.category.clone(),
                        },
                    );
                }
                ControllerKind::Encoder => {}
            }
        }
    }

    let plugins = std::mem::take(&mut current.pedalboard.plugins);
    let (mut plugins, footswitched): (Vec<_>, Vec<_>) =
        plugins.into_iter().partition(|p| !p.has_footswitch);
    plugins.extend(footswitched);
    current.pedalboard.plugins = plugins;
}

/// Step through a sparse preset map, wrapping at either end.
///
/// Returns `None` when `current` is not a known preset index.
pub fn next_preset_index(
    presets: &BTreeMap<u32, String>,
    current: u32,
    forward: bool,
) -> Option<u32> {
    if !presets.contains_key(&current) {
        return None;
    }
    if forward {
        presets
            .range((Bound::Excluded(current), Bound::Unbounded))
            .next()
            .or_else(|| presets.iter().next())
            .map(|(k, _)| *k)
    } else {
        presets
            .range(..current)
            .next_back()
            .or_else(|| presets.iter().next_back())
            .map(|(k, _)| *k)
    }
}
