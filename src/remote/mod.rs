//! Gateway to the audio host that actually runs the pedalboards.

pub mod mod_host;
pub mod offline;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::session::{Parameter, Pedalboard, Plugin};

/// File inside a bundle directory describing its plugins.
pub const BUNDLE_FILE: &str = "pedalboard.toml";

/// One entry of the host's pedalboard library.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PedalboardInfo {
    pub title: String,
    pub bundle: String,
}

/// Operations the navigator needs from the host. Every call is blocking.
pub trait RemoteHost {
    fn list_pedalboards(&mut self) -> anyhow::Result<Vec<PedalboardInfo>>;
    fn current_pedalboard_bundle(&mut self) -> anyhow::Result<Option<String>>;
    fn reset(&mut self) -> anyhow::Result<()>;
    fn load_pedalboard(&mut self, bundle: &str) -> anyhow::Result<()>;
    /// Overwrite the existing bundle saved under `title`.
    fn save_pedalboard(&mut self, title: &str) -> anyhow::Result<()>;
    /// Presets of the loaded pedalboard. Indices may have gaps.
    fn list_presets(&mut self) -> anyhow::Result<BTreeMap<u32, String>>;
    fn load_preset(&mut self, index: u32) -> anyhow::Result<()>;
    fn get_plugin_bypass(&mut self, instance_id: &str) -> anyhow::Result<bool>;
    fn set_plugin_bypass(&mut self, instance_id: &str, bypassed: bool) -> anyhow::Result<()>;
    fn get_parameter(&mut self, instance_id: &str, symbol: &str) -> anyhow::Result<f32>;
    fn set_parameter(&mut self, instance_id: &str, symbol: &str, value: f32) -> anyhow::Result<()>;
}

/// Reads the plugin structure of a pedalboard bundle.
pub trait BundleReader {
    fn load_bundle(&self, title: &str, bundle: &str) -> anyhow::Result<Pedalboard>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParameterEntry {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: f32,
    #[serde(default)]
    minimum: f32,
    #[serde(default = "default_maximum")]
    maximum: f32,
    #[serde(default)]
    binding: Option<String>,
}

fn default_maximum() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
pub(crate) struct PluginEntry {
    instance_id: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    bypassed: bool,
    #[serde(default)]
    parameters: Vec<ParameterEntry>,
}

impl PluginEntry {
    pub(crate) fn to_plugin(&self) -> Plugin {
        let mut plugin = Plugin::new(&self.instance_id, &self.category);
        plugin.bypassed = self.bypassed;
        for p in &self.parameters {
            let name = p.name.as_deref().unwrap_or(&p.symbol);
            let mut param = Parameter::new(&p.symbol, name, p.value, p.minimum, p.maximum);
            if let Some(key) = &p.binding {
                param = param.with_binding(key);
            }
            plugin = plugin.with_parameter(param);
        }
        plugin
    }
}

#[derive(Debug, Deserialize)]
struct BundleFile {
    #[serde(default)]
    plugins: Vec<PluginEntry>,
}

/// Parse the contents of a bundle's `pedalboard.toml`.
pub fn parse_bundle(title: &str, bundle: &str, text: &str) -> anyhow::Result<Pedalboard> {
    let file: BundleFile = toml::from_str(text)?;
    let plugins = file.plugins.iter().map(PluginEntry::to_plugin).collect();
    Ok(Pedalboard::new(title, bundle, plugins))
}

/// Bundles on the local filesystem, one directory per pedalboard.
pub struct TomlBundles;

impl BundleReader for TomlBundles {
    fn load_bundle(&self, title: &str, bundle: &str) -> anyhow::Result<Pedalboard> {
        let path = Path::new(bundle).join(BUNDLE_FILE);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        parse_bundle(title, bundle, &text).with_context(|| format!("parsing {}", path.display()))
    }
}
