use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

use crate::hardware::ControllerKind;

/// Name of the optional per-pedalboard hardware override inside a bundle.
pub const BUNDLE_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host_url: String,
    /// Touched by the host whenever a pedalboard is loaded from another UI.
    pub modification_file: PathBuf,
    pub hardware: Generation,
    pub toolbar: bool,
    /// Rotation step on a 0..=127 scale, remapped into each parameter's range.
    pub tweak_amount: f32,
    pub audio: AudioConfig,
    pub system: SystemConfig,
    pub hardware_config: HardwareConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host_url: "http://localhost:80/".into(),
            modification_file: PathBuf::from("/var/modep/last.json"),
            hardware: Generation::default(),
            toolbar: true,
            tweak_amount: 8.0,
            audio: AudioConfig::default(),
            system: SystemConfig::default(),
            hardware_config: HardwareConfig::default(),
        }
    }
}

/// Which encoder layout the device has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    /// Two encoders (top: pedalboard/preset/system, bottom: plugins).
    V1,
    /// One encoder driving everything.
    #[default]
    Core,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub card: String,
    pub capture_control: String,
    pub master_control: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            card: "0".into(),
            capture_control: "Capture".into(),
            master_control: "Master".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub shutdown: String,
    pub reboot: String,
    pub restart_audio: String,
    pub wifi_status: String,
    pub hotspot_up: String,
    pub hotspot_down: String,
    /// Git checkout queried for the software version.
    pub homedir: PathBuf,
    pub hotspot_settle_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            shutdown: "sudo systemctl --no-wall poweroff".into(),
            reboot: "systemctl reboot".into(),
            restart_audio: "systemctl restart jack".into(),
            wifi_status: "/usr/bin/patchbox wifi status".into(),
            hotspot_up: "/usr/bin/patchbox wifi hotspot up".into(),
            hotspot_down: "/usr/bin/patchbox wifi hotspot down".into(),
            homedir: PathBuf::from("."),
            hotspot_settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub controllers: Vec<ControllerConfig>,
    pub footswitches: Vec<FootswitchConfig>,
}

impl HardwareConfig {
    /// Entries of `other` replace entries with the same key/index; the rest are added.
    pub fn merged(&self, other: &HardwareConfig) -> HardwareConfig {
        let mut merged = self.clone();
        for c in &other.controllers {
            match merged.controllers.iter_mut().find(|m| m.key == c.key) {
                Some(existing) => *existing = c.clone(),
                None => merged.controllers.push(c.clone()),
            }
        }
        for f in &other.footswitches {
            match merged.footswitches.iter_mut().find(|m| m.index == f.index) {
                Some(existing) => *existing = f.clone(),
                None => merged.footswitches.push(f.clone()),
            }
        }
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ControllerConfig {
    /// Binding key as it appears in pedalboard parameter bindings.
    pub key: String,
    pub kind: ControllerKind,
    #[serde(default)]
    pub name: String,
}

impl ControllerConfig {
    pub fn new(key: &str, kind: ControllerKind, name: &str) -> Self {
        ControllerConfig {
            key: key.to_string(),
            kind,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetStep {
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FootswitchConfig {
    pub index: usize,
    /// Controller key of the footswitch, matched against parameter bindings.
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub relay: bool,
    #[serde(default)]
    pub preset: Option<PresetStep>,
}

impl FootswitchConfig {
    pub fn bound(index: usize, key: &str) -> Self {
        FootswitchConfig {
            index,
            binding: Some(key.to_string()),
            relay: false,
            preset: None,
        }
    }
}

/// Load the main configuration.
///
/// With no explicit path a missing `pistomp.toml` yields the defaults.
pub fn load(path: Option<&str>) -> anyhow::Result<Config> {
    let (path, required) = match path {
        Some(p) => (Path::new(p), true),
        None => (Path::new("pistomp.toml"), false),
    };
    if !required && !path.exists() {
        log::info!("No {} found, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Read the hardware override shipped inside a pedalboard bundle, if any.
///
/// A malformed file is logged and treated as absent.
pub fn load_bundle_override(bundle: &str) -> Option<HardwareConfig> {
    let path = Path::new(bundle).join(BUNDLE_CONFIG_FILE);
    if !path.exists() {
        return None;
    }
    let parsed = std::fs::read_to_string(&path)
        .map_err(anyhow::Error::from)
        .and_then(|content| Ok(toml::from_str::<HardwareConfig>(&content)?));
    match parsed {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("Ignoring {}: {e}", path.display());
            None
        }
    }
}
