//! Encoder state machines.
//!
//! Each hardware generation gets a transition table: a pure function from
//! (state, event, context) to the next state plus the list of side effects
//! the navigator must carry out. Nothing here touches the session or the
//! display, so every transition can be tested on its own.

use std::fmt::Debug;

use crate::deep::{CommitTarget, Direction};
use crate::selection::SelectedType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderEvent {
    Released,
    LongPressed,
    Rotate(Direction),
}

/// Top encoder of the dual-encoder hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopMode {
    #[default]
    Default,
    PresetSelect,
    PresetSelected,
    PedalboardSelect,
    PedalboardSelected,
    SystemMenu,
    HeadphoneVolume,
    InputGain,
}

impl TopMode {
    /// Modes that own the display and pre-empt the bottom encoder.
    pub fn is_system(self) -> bool {
        matches!(
            self,
            TopMode::SystemMenu | TopMode::HeadphoneVolume | TopMode::InputGain
        )
    }
}

/// Bottom encoder of the dual-encoder hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BottomMode {
    #[default]
    Default,
    DeepEdit,
    ValueEdit,
}

/// Single encoder of the unified hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniversalMode {
    #[default]
    Default,
    Scroll,
    PedalboardSelect,
    PresetSelect,
    SystemMenu,
    HeadphoneVolume,
    InputGain,
    DeepEdit,
    ValueEdit,
    Loading,
}

/// A remote commit that runs after the machine has entered LOADING.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Pedalboard,
    Preset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Toggle bypass of the selected plugin.
    ToggleBypass,
    /// Toggle the system bypass relay.
    ToggleRelay,
    ClearSelect,
    SelectionAdvance(Direction),
    PluginAdvance(Direction),
    PedalboardCandidate(Direction),
    PresetCandidate(Direction),
    CommitPedalboard,
    CommitPreset,
    MenuAdvance(Direction),
    MenuInvoke,
    ShowSystemMenu,
    /// Show the parameter pick-list of the selected plugin.
    ShowParameterEdit { keep_cursor: bool },
    Nudge(Direction, CommitTarget),
    RedrawHome,
    RedrawTitle,
    Defer(Commit),
}

/// What a transition may look at besides its own state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    /// Kind under the selection cursor.
    pub selected: Option<SelectedType>,
    pub has_presets: bool,
    /// Current top encoder mode; gates the bottom encoder.
    pub top: TopMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<M> {
    pub next: M,
    pub effects: Vec<Effect>,
}

impl<M> Transition<M> {
    pub fn to(next: M) -> Self {
        Transition {
            next,
            effects: Vec::new(),
        }
    }

    pub fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

pub trait StateMachine: Copy + Eq + Debug {
    fn transition(self, event: EncoderEvent, ctx: &Context) -> Transition<Self>;
}

impl StateMachine for UniversalMode {
    fn transition(self, event: EncoderEvent, ctx: &Context) -> Transition<Self> {
        use EncoderEvent::*;
        use UniversalMode as M;

        let stay = Transition::to(self);
        let home = Transition::to(M::Default).with(Effect::RedrawHome);
        match (self, event) {
            (M::Loading, _) => stay,

            (M::Default, Released) => Transition::to(M::Scroll),
            (M::Default, LongPressed) => Transition::to(M::SystemMenu).with(Effect::ShowSystemMenu),
            (M::Default, Rotate(d)) => Transition::to(M::Scroll).with(Effect::SelectionAdvance(d)),

            (M::Scroll, Released) => match ctx.selected {
                Some(SelectedType::Plugin) => stay.with(Effect::ToggleBypass),
                Some(SelectedType::Pedalboard) => {
                    Transition::to(M::PedalboardSelect).with(Effect::RedrawTitle)
                }
                Some(SelectedType::Preset) => {
                    Transition::to(M::PresetSelect).with(Effect::RedrawTitle)
                }
                Some(SelectedType::Bypass) => stay.with(Effect::ToggleRelay),
                Some(SelectedType::System) => Transition::to(M::SystemMenu)
                    .with(Effect::ClearSelect)
                    .with(Effect::ShowSystemMenu),
                None => stay,
            },
            (M::Scroll, LongPressed) if ctx.selected == Some(SelectedType::Plugin) => {
                Transition::to(M::DeepEdit).with(Effect::ShowParameterEdit { keep_cursor: false })
            }
            (M::Scroll, LongPressed) => home,
            (M::Scroll, Rotate(d)) => stay.with(Effect::SelectionAdvance(d)),

            (M::PedalboardSelect, Released) => {
                Transition::to(M::Loading).with(Effect::Defer(Commit::Pedalboard))
            }
            (M::PedalboardSelect, Rotate(d)) => stay.with(Effect::PedalboardCandidate(d)),
            (M::PresetSelect, Released) => {
                Transition::to(M::Loading).with(Effect::Defer(Commit::Preset))
            }
            (M::PresetSelect, Rotate(d)) => stay.with(Effect::PresetCandidate(d)),

            (M::SystemMenu | M::DeepEdit, Released) => stay.with(Effect::MenuInvoke),
            (M::SystemMenu | M::DeepEdit, Rotate(d)) => stay.with(Effect::MenuAdvance(d)),

            (M::HeadphoneVolume | M::InputGain, Released) => {
                Transition::to(M::SystemMenu).with(Effect::ShowSystemMenu)
            }
            (M::HeadphoneVolume, Rotate(d)) => {
                stay.with(Effect::Nudge(d, CommitTarget::HeadphoneVolume))
            }
            (M::InputGain, Rotate(d)) => stay.with(Effect::Nudge(d, CommitTarget::InputGain)),

            (M::ValueEdit, Released) => {
                Transition::to(M::DeepEdit).with(Effect::ShowParameterEdit { keep_cursor: true })
            }
            (M::ValueEdit, LongPressed) => {
                Transition::to(M::DeepEdit).with(Effect::ShowParameterEdit { keep_cursor: false })
            }
            (M::ValueEdit, Rotate(d)) => stay.with(Effect::Nudge(d, CommitTarget::PluginParameter)),

            (_, LongPressed) => home,
        }
    }
}

impl StateMachine for TopMode {
    fn transition(self, event: EncoderEvent, ctx: &Context) -> Transition<Self> {
        use EncoderEvent::*;
        use TopMode as M;

        let stay = Transition::to(self);
        let preset_or_pedalboard = if ctx.has_presets {
            M::PresetSelect
        } else {
            M::PedalboardSelect
        };
        match (self, event) {
            (M::Default, Released) => {
                Transition::to(preset_or_pedalboard).with(Effect::RedrawTitle)
            }
            (M::PresetSelect, Released) => {
                Transition::to(M::PedalboardSelect).with(Effect::RedrawTitle)
            }
            (M::PedalboardSelect, Released) if ctx.has_presets => {
                Transition::to(M::PresetSelect).with(Effect::RedrawTitle)
            }
            (M::PedalboardSelect, Released) => {
                Transition::to(M::Default).with(Effect::RedrawTitle)
            }
            (M::PresetSelected, Released) => Transition::to(M::PresetSelect)
                .with(Effect::CommitPreset)
                .with(Effect::RedrawTitle),
            (M::PedalboardSelected, Released) => Transition::to(M::Default)
                .with(Effect::CommitPedalboard)
                .with(Effect::RedrawTitle),
            (M::SystemMenu, Released) => stay.with(Effect::MenuInvoke),
            (M::HeadphoneVolume | M::InputGain, Released) => {
                Transition::to(M::SystemMenu).with(Effect::ShowSystemMenu)
            }

            (M::Default, LongPressed) => {
                Transition::to(M::SystemMenu).with(Effect::ShowSystemMenu)
            }
            (_, LongPressed) => Transition::to(M::Default).with(Effect::RedrawHome),

            (M::PedalboardSelect | M::PedalboardSelected, Rotate(d)) => {
                Transition::to(M::PedalboardSelected).with(Effect::PedalboardCandidate(d))
            }
            (M::PresetSelect | M::PresetSelected, Rotate(d)) => {
                Transition::to(M::PresetSelected).with(Effect::PresetCandidate(d))
            }
            (M::SystemMenu, Rotate(d)) => stay.with(Effect::MenuAdvance(d)),
            (M::HeadphoneVolume, Rotate(d)) => {
                stay.with(Effect::Nudge(d, CommitTarget::HeadphoneVolume))
            }
            (M::InputGain, Rotate(d)) => stay.with(Effect::Nudge(d, CommitTarget::InputGain)),
            (M::Default, Rotate(_)) => stay,
        }
    }
}

impl StateMachine for BottomMode {
    fn transition(self, event: EncoderEvent, ctx: &Context) -> Transition<Self> {
        use BottomMode as M;
        use EncoderEvent::*;

        let stay = Transition::to(self);
        if ctx.top.is_system() {
            return stay;
        }
        match (self, event) {
            (M::Default, Released) => stay.with(Effect::ToggleBypass),
            (M::DeepEdit, Released) => stay.with(Effect::MenuInvoke),
            (M::ValueEdit, Released) => stay,

            (M::Default | M::ValueEdit, LongPressed) => {
                Transition::to(M::DeepEdit).with(Effect::ShowParameterEdit { keep_cursor: false })
            }
            (M::DeepEdit, LongPressed) => Transition::to(M::Default).with(Effect::RedrawHome),

            (M::Default, Rotate(d)) => stay.with(Effect::PluginAdvance(d)),
            (M::DeepEdit, Rotate(d)) => stay.with(Effect::MenuAdvance(d)),
            (M::ValueEdit, Rotate(d)) => stay.with(Effect::Nudge(d, CommitTarget::PluginParameter)),
        }
    }
}
