pub mod keyboard;

use std::collections::BTreeMap;

use crossbeam_channel::Receiver;
use serde::Deserialize;

use crate::config::{HardwareConfig, PresetStep};
use crate::modes::EncoderEvent;
use crate::session::ParamRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    Analog,
    Footswitch,
    Encoder,
}

/// A physical input that can drive one parameter of the current pedalboard.
#[derive(Debug, Clone)]
pub struct Controller {
    pub name: String,
    pub kind: ControllerKind,
    /// Last value shown for the bound parameter.
    pub value: f32,
    pub parameter: Option<ParamRef>,
}

#[derive(Debug, Clone)]
pub struct Footswitch {
    pub index: usize,
    pub binding: Option<String>,
    pub relay: bool,
    pub preset: Option<PresetStep>,
    /// LED lit means the controlled plugin is active, or for the relay footswitch that effects are in the path.
    pub led: bool,
}

/// True bypass relay. Enabled routes the input straight to the output.
#[derive(Debug, Default)]
pub struct Relay {
    pub enabled: bool,
}

impl Relay {
    pub fn enable(&mut self) {
        log::info!("Relay enabled");
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        log::info!("Relay disabled");
        self.enabled = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderId {
    Top,
    Bottom,
    Universal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Encoder(EncoderId, EncoderEvent),
    Footswitch(usize),
    Quit,
}

/// Where raw input comes from (GPIO scanner, keyboard, test script).
pub trait InputSource {
    /// Return every event captured since the last call without blocking.
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// Single-consumer end of a capture thread's event queue.
pub struct ChannelInput {
    rx: Receiver<InputEvent>,
}

impl ChannelInput {
    pub fn new(rx: Receiver<InputEvent>) -> Self {
        ChannelInput { rx }
    }
}

impl InputSource for ChannelInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.rx.try_iter().collect()
    }
}

/// Controllers, footswitches and relay of the device.
pub struct Hardware {
    defaults: HardwareConfig,
    pub controllers: BTreeMap<String, Controller>,
    pub footswitches: Vec<Footswitch>,
    pub relay: Relay,
    input: Option<Box<dyn InputSource>>,
}

impl Hardware {
    pub fn new(defaults: HardwareConfig) -> Self {
        let mut hw = Hardware {
            defaults,
            controllers: BTreeMap::new(),
            footswitches: Vec::new(),
            relay: Relay::default(),
            input: None,
        };
        let defaults = hw.defaults.clone();
        hw.apply(&defaults);
        hw
    }

    pub fn with_input(mut self, input: Box<dyn InputSource>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn poll_controls(&mut self) -> Vec<InputEvent> {
        match self.input.as_mut() {
            Some(input) => input.poll(),
            None => Vec::new(),
        }
    }

    /// Rebuild controllers and footswitches for a newly current pedalboard.
    ///
    /// Starts from the defaults so nothing bound for the previous pedalboard survives.
    pub fn reinit(&mut self, overrides: Option<&HardwareConfig>) {
        let cfg = match overrides {
            Some(o) => self.defaults.merged(o),
            None => self.defaults.clone(),
        };
        self.apply(&cfg);
    }

    fn apply(&mut self, cfg: &HardwareConfig) {
        self.controllers = cfg
            .controllers
            .iter()
            .map(|c| {
                (
                    c.key.clone(),
                    Controller {
                        name: if c.name.is_empty() { c.key.clone() } else { c.name.clone() },
                        kind: c.kind,
                        value: 0.0,
                        parameter: None,
                    },
                )
            })
            .collect();
        let mut footswitches: Vec<Footswitch> = cfg
            .footswitches
            .iter()
            .map(|f| Footswitch {
                index: f.index,
                binding: f.binding.clone(),
                relay: f.relay,
                preset: f.preset,
                led: false,
            })
            .collect();
        footswitches.sort_by_key(|f| f.index);
        self.footswitches = footswitches;
    }

    pub fn footswitch(&self, index: usize) -> Option<&Footswitch> {
        self.footswitches.iter().find(|f| f.index == index)
    }

    pub fn footswitch_mut(&mut self, index: usize) -> Option<&mut Footswitch> {
        self.footswitches.iter_mut().find(|f| f.index == index)
    }

    /// The footswitch whose binding is one of `keys`.
    pub fn footswitch_bound_to(&self, keys: &[String]) -> Option<usize> {
        self.footswitches
            .iter()
            .find(|f| f.binding.as_ref().is_some_and(|b| keys.contains(b)))
            .map(|f| f.index)
    }

    pub fn relay_footswitch(&self) -> Option<usize> {
        self.footswitches.iter().find(|f| f.relay).map(|f| f.index)
    }

    /// Parameter currently driven by the footswitch at `index`.
    pub fn footswitch_parameter(&self, index: usize) -> Option<&ParamRef> {
        let key = self.footswitch(index)?.binding.as_ref()?;
        self.controllers.get(key)?.parameter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ControllerConfig, FootswitchConfig};
    use crate::deep::Direction;

    fn config() -> HardwareConfig {
        HardwareConfig {
            controllers: vec![
                ControllerConfig::new("0:60", ControllerKind::Footswitch, "FS1"),
                ControllerConfig::new("0:70", ControllerKind::Analog, ""),
            ],
            footswitches: vec![
                FootswitchConfig::bound(1, "0:60"),
                FootswitchConfig {
                    index: 0,
                    binding: None,
                    relay: true,
                    preset: None,
                },
            ],
        }
    }

    #[test]
    fn footswitches_sorted_and_controller_names_defaulted() {
        let hw = Hardware::new(config());
        assert_eq!(hw.footswitches[0].index, 0);
        assert_eq!(hw.controllers["0:70"].name, "0:70");
        assert_eq!(hw.relay_footswitch(), Some(0));
        assert_eq!(hw.footswitch_bound_to(&["0:60".into()]), Some(1));
    }

    #[test]
    fn reinit_drops_parameter_references() {
        let mut hw = Hardware::new(config());
        hw.controllers.get_mut("0:60").unwrap().parameter = Some(ParamRef {
            instance_id: "fuzz".into(),
            symbol: "on".into(),
        });
        assert!(hw.footswitch_parameter(1).is_some());

        hw.reinit(None);

        assert!(hw.footswitch_parameter(1).is_none());
    }

    #[test]
    fn reinit_applies_override() {
        let mut hw = Hardware::new(config());
        let over = HardwareConfig {
            controllers: Vec::new(),
            footswitches: vec![FootswitchConfig::bound(0, "0:60")],
        };
        hw.reinit(Some(&over));
        assert_eq!(hw.footswitch(0).unwrap().binding.as_deref(), Some("0:60"));
        assert!(!hw.footswitch(0).unwrap().relay);

        hw.reinit(None);
        assert!(hw.footswitch(0).unwrap().relay);
    }

    #[test]
    fn channel_input_drains_queue() {
        let (tx, rx) = crossbeam_channel::bounded(8);
        let mut hw = Hardware::new(config()).with_input(Box::new(ChannelInput::new(rx)));
        tx.send(InputEvent::Footswitch(1)).unwrap();
        tx.send(InputEvent::Encoder(
            EncoderId::Universal,
            EncoderEvent::Rotate(Direction::Forward),
        ))
        .unwrap();

        assert_eq!(hw.poll_controls().len(), 2);
        assert!(hw.poll_controls().is_empty());
    }
}
