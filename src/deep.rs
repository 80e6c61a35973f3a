use crate::session::{Parameter, Plugin};

/// Upper bound of the logical range the tweak amount is expressed in.
const LOGICAL_MAX: f32 = 127.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        self == Direction::Forward
    }
}

/// Where a nudged value gets written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTarget {
    PluginParameter,
    InputGain,
    HeadphoneVolume,
}

/// A system-level scalar edited through the same value screen as plugin parameters.
#[derive(Debug, Clone, Copy)]
pub struct ScalarSpec {
    pub title: &'static str,
    pub symbol: &'static str,
    pub minimum: f32,
    pub maximum: f32,
}

pub const INPUT_GAIN: ScalarSpec = ScalarSpec {
    title: "Input Gain",
    symbol: "igain",
    minimum: -19.75,
    maximum: 12.0,
};

pub const HEADPHONE_VOLUME: ScalarSpec = ScalarSpec {
    title: "Headphone Volume",
    symbol: "hvol",
    minimum: -25.75,
    maximum: 6.0,
};

impl ScalarSpec {
    pub fn parameter(&self, value: f32) -> Parameter {
        Parameter::new(self.symbol, self.title, value, self.minimum, self.maximum)
    }
}

/// Transient editing state for one plugin or one system scalar.
#[derive(Debug, Default)]
pub struct DeepEdit {
    /// `None` when editing a system scalar.
    pub plugin: Option<String>,
    pub parameters: Vec<Parameter>,
    pub selected_index: usize,
    pub selected: Option<Parameter>,
}

impl DeepEdit {
    pub fn for_plugin(plugin: &Plugin) -> Self {
        DeepEdit {
            plugin: Some(plugin.instance_id.clone()),
            parameters: plugin.editable_parameters(),
            selected_index: 0,
            selected: None,
        }
    }

    pub fn for_scalar(param: Parameter) -> Self {
        DeepEdit {
            plugin: None,
            parameters: Vec::new(),
            selected_index: 0,
            selected: Some(param),
        }
    }
}

/// Size of one rotation step for a parameter, `tweak_amount` out of 127
/// scaled to the parameter's span.
pub fn tweak_step(param: &Parameter, tweak_amount: f32) -> f32 {
    tweak_amount / LOGICAL_MAX * (param.maximum - param.minimum)
}

/// Value after one rotation, clamped to the parameter's range.
///
/// Returns `None` when the value would not change.
pub fn nudge(param: &Parameter, direction: Direction, tweak_amount: f32) -> Option<f32> {
    let step = tweak_step(param, tweak_amount);
    let raw = match direction {
        Direction::Forward => param.value + step,
        Direction::Backward => param.value - step,
    };
    let new_value = ((raw * 100.0).round() / 100.0).clamp(param.minimum, param.maximum);
    (new_value != param.value).then_some(new_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::BYPASS_SYMBOL;

    #[test]
    fn step_is_scaled_to_span() {
        let p = Parameter::new("gain", "Gain", 0.0, 0.0, 127.0);
        assert_eq!(tweak_step(&p, 8.0), 8.0);
        let p = Parameter::new("mix", "Mix", 0.0, -1.0, 1.0);
        assert!((tweak_step(&p, 127.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn nudge_moves_by_step_and_rounds() {
        let p = Parameter::new("gain", "Gain", 10.0, 0.0, 127.0);
        assert_eq!(nudge(&p, Direction::Forward, 8.0), Some(18.0));
        assert_eq!(nudge(&p, Direction::Backward, 8.0), Some(2.0));
        let p = Parameter::new("mix", "Mix", 0.5, 0.0, 1.0);
        assert_eq!(nudge(&p, Direction::Forward, 8.0), Some(0.56));
    }

    #[test]
    fn nudge_clamps_to_maximum() {
        let p = Parameter::new("gain", "Gain", 125.0, 0.0, 127.0);
        assert_eq!(nudge(&p, Direction::Forward, 8.0), Some(127.0));
    }

    #[test]
    fn nudge_clamps_to_minimum() {
        let p = Parameter::new("vol", "Volume", -25.0, -25.75, 6.0);
        assert_eq!(nudge(&p, Direction::Backward, 8.0), Some(-25.75));
    }

    #[test]
    fn nudge_at_bound_is_unchanged() {
        let p = Parameter::new("gain", "Gain", 127.0, 0.0, 127.0);
        assert_eq!(nudge(&p, Direction::Forward, 8.0), None);
        let p = Parameter::new("gain", "Gain", 0.0, 0.0, 127.0);
        assert_eq!(nudge(&p, Direction::Backward, 8.0), None);
    }

    #[test]
    fn plugin_snapshot_excludes_bypass() {
        let plugin = Plugin::new("amp", "Simulator")
            .with_parameter(Parameter::new(BYPASS_SYMBOL, "Bypass", 0.0, 0.0, 1.0))
            .with_parameter(Parameter::new("bass", "Bass", 5.0, 0.0, 10.0))
            .with_parameter(Parameter::new("treble", "Treble", 5.0, 0.0, 10.0));
        let deep = DeepEdit::for_plugin(&plugin);
        assert_eq!(deep.plugin.as_deref(), Some("amp"));
        assert_eq!(deep.parameters.len(), 2);
        assert!(deep.selected.is_none());
    }
}
