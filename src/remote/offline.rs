use std::collections::BTreeMap;

use anyhow::Context;
use serde::Deserialize;

use super::{BundleReader, PedalboardInfo, PluginEntry, RemoteHost};
use crate::session::{Pedalboard, Plugin};

#[derive(Debug, Deserialize)]
struct PresetEntry {
    index: u32,
    name: String,
    /// Plugins bypassed once this preset is loaded.
    #[serde(default)]
    bypassed: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PedalboardEntry {
    title: String,
    bundle: String,
    #[serde(default)]
    plugins: Vec<PluginEntry>,
    #[serde(default)]
    presets: Vec<PresetEntry>,
}

#[derive(Debug, Deserialize)]
struct Fixture {
    #[serde(default)]
    current: Option<String>,
    #[serde(default)]
    pedalboards: Vec<PedalboardEntry>,
}

struct Preset {
    name: String,
    bypassed: Vec<String>,
}

struct Board {
    pedalboard: Pedalboard,
    presets: BTreeMap<u32, Preset>,
}

/// In-memory host backed by a fixture file, for running without a MOD host.
pub struct OfflineHost {
    boards: Vec<Board>,
    current: Option<usize>,
    /// Live plugin state of the loaded pedalboard.
    live: Vec<Plugin>,
}

impl OfflineHost {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        Self::from_toml(&text).with_context(|| format!("parsing {path}"))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let fixture: Fixture = toml::from_str(text)?;
        let boards = fixture
            .pedalboards
            .iter()
            .map(|pb| Board {
                pedalboard: Pedalboard::new(
                    &pb.title,
                    &pb.bundle,
                    pb.plugins.iter().map(PluginEntry::to_plugin).collect(),
                ),
                presets: pb
                    .presets
                    .iter()
                    .map(|p| {
                        (
                            p.index,
                            Preset {
                                name: p.name.clone(),
                                bypassed: p.bypassed.clone(),
                            },
                        )
                    })
                    .collect(),
            })
            .collect();
        let mut host = OfflineHost {
            boards,
            current: None,
            live: Vec::new(),
        };
        let start = match fixture.current {
            Some(bundle) => Some(bundle),
            None => host.boards.first().map(|b| b.pedalboard.bundle.clone()),
        };
        if let Some(bundle) = start {
            host.load_pedalboard(&bundle)?;
        }
        Ok(host)
    }

    /// Bundle reader over the same fixture.
    pub fn bundles(&self) -> OfflineBundles {
        OfflineBundles {
            pedalboards: self.boards.iter().map(|b| b.pedalboard.clone()).collect(),
        }
    }

    fn live_plugin(&mut self, instance_id: &str) -> anyhow::Result<&mut Plugin> {
        self.live
            .iter_mut()
            .find(|p| p.instance_id == instance_id)
            .ok_or_else(|| anyhow::anyhow!("no plugin {instance_id} in loaded pedalboard"))
    }
}

impl RemoteHost for OfflineHost {
    fn list_pedalboards(&mut self) -> anyhow::Result<Vec<PedalboardInfo>> {
        Ok(self
            .boards
            .iter()
            .map(|b| PedalboardInfo {
                title: b.pedalboard.title.clone(),
                bundle: b.pedalboard.bundle.clone(),
            })
            .collect())
    }

    fn current_pedalboard_bundle(&mut self) -> anyhow::Result<Option<String>> {
        Ok(self
            .current
            .map(|i| self.boards[i].pedalboard.bundle.clone()))
    }

    fn reset(&mut self) -> anyhow::Result<()> {
        self.current = None;
        self.live.clear();
        Ok(())
    }

    fn load_pedalboard(&mut self, bundle: &str) -> anyhow::Result<()> {
        let index = self
            .boards
            .iter()
            .position(|b| b.pedalboard.bundle == bundle)
            .ok_or_else(|| anyhow::anyhow!("unknown bundle {bundle}"))?;
        self.current = Some(index);
        self.live = self.boards[index].pedalboard.plugins.clone();
        log::info!("(offline) loaded {bundle}");
        Ok(())
    }

    fn save_pedalboard(&mut self, title: &str) -> anyhow::Result<()> {
        let index = self.current.context("no pedalboard loaded")?;
        let board = &mut self.boards[index];
        board.pedalboard.title = title.to_string();
        board.pedalboard.plugins = self.live.clone();
        log::info!("(offline) saved {title}");
        Ok(())
    }

    fn list_presets(&mut self) -> anyhow::Result<BTreeMap<u32, String>> {
        let Some(index) = self.current else {
            return Ok(BTreeMap::new());
        };
        Ok(self.boards[index]
            .presets
            .iter()
            .map(|(i, p)| (*i, p.name.clone()))
            .collect())
    }

    fn load_preset(&mut self, index: u32) -> anyhow::Result<()> {
        let board = self.current.context("no pedalboard loaded")?;
        let preset = self.boards[board]
            .presets
            .get(&index)
            .with_context(|| format!("no preset {index}"))?;
        for plugin in &mut self.live {
            plugin.bypassed = preset.bypassed.contains(&plugin.instance_id);
        }
        Ok(())
    }

    fn get_plugin_bypass(&mut self, instance_id: &str) -> anyhow::Result<bool> {
        Ok(self.live_plugin(instance_id)?.bypassed)
    }

    fn set_plugin_bypass(&mut self, instance_id: &str, bypassed: bool) -> anyhow::Result<()> {
        self.live_plugin(instance_id)?.bypassed = bypassed;
        Ok(())
    }

    fn get_parameter(&mut self, instance_id: &str, symbol: &str) -> anyhow::Result<f32> {
        let plugin = self.live_plugin(instance_id)?;
        plugin
            .parameters
            .get(symbol)
            .map(|p| p.value)
            .with_context(|| format!("no parameter {symbol} on {instance_id}"))
    }

    fn set_parameter(&mut self, instance_id: &str, symbol: &str, value: f32) -> anyhow::Result<()> {
        let plugin = self.live_plugin(instance_id)?;
        let param = plugin
            .parameters
            .get_mut(symbol)
            .with_context(|| format!("no parameter {symbol} on {instance_id}"))?;
        param.value = value;
        Ok(())
    }
}

pub struct OfflineBundles {
    pedalboards: Vec<Pedalboard>,
}

impl BundleReader for OfflineBundles {
    fn load_bundle(&self, title: &str, bundle: &str) -> anyhow::Result<Pedalboard> {
        let mut pb = self
            .pedalboards
            .iter()
            .find(|p| p.bundle == bundle)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown bundle {bundle}"))?;
        pb.title = title.to_string();
        Ok(pb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
current = "/pb/lead"

[[pedalboards]]
title = "Clean"
bundle = "/pb/clean"

[[pedalboards.plugins]]
instance_id = "comp"

[[pedalboards]]
title = "Lead"
bundle = "/pb/lead"

[[pedalboards.plugins]]
instance_id = "fuzz"

[[pedalboards.plugins.parameters]]
symbol = "gain"
value = 0.25

[[pedalboards.plugins]]
instance_id = "delay"

[[pedalboards.presets]]
index = 0
name = "Rhythm"
bypassed = ["fuzz"]

[[pedalboards.presets]]
index = 2
name = "Solo"
"#;

    #[test]
    fn starts_on_named_current() {
        let mut host = OfflineHost::from_toml(FIXTURE).unwrap();
        assert_eq!(host.current_pedalboard_bundle().unwrap().as_deref(), Some("/pb/lead"));
        assert_eq!(host.list_pedalboards().unwrap().len(), 2);
        let presets = host.list_presets().unwrap();
        assert_eq!(presets.keys().copied().collect::<Vec<_>>(), [0, 2]);
    }

    #[test]
    fn preset_load_changes_bypass() {
        let mut host = OfflineHost::from_toml(FIXTURE).unwrap();
        assert!(!host.get_plugin_bypass("fuzz").unwrap());
        host.load_preset(0).unwrap();
        assert!(host.get_plugin_bypass("fuzz").unwrap());
        assert!(!host.get_plugin_bypass("delay").unwrap());
        host.load_preset(2).unwrap();
        assert!(!host.get_plugin_bypass("fuzz").unwrap());
        assert!(host.load_preset(1).is_err());
    }

    #[test]
    fn parameters_and_unknown_plugins() {
        let mut host = OfflineHost::from_toml(FIXTURE).unwrap();
        assert_eq!(host.get_parameter("fuzz", "gain").unwrap(), 0.25);
        host.set_parameter("fuzz", "gain", 0.75).unwrap();
        assert_eq!(host.get_parameter("fuzz", "gain").unwrap(), 0.75);
        assert!(host.set_plugin_bypass("comp", true).is_err());
    }

    #[test]
    fn switching_pedalboards() {
        let mut host = OfflineHost::from_toml(FIXTURE).unwrap();
        host.reset().unwrap();
        assert_eq!(host.current_pedalboard_bundle().unwrap(), None);
        host.load_pedalboard("/pb/clean").unwrap();
        assert!(host.list_presets().unwrap().is_empty());
        assert!(host.load_pedalboard("/pb/missing").is_err());
    }

    #[test]
    fn bundles_share_the_fixture() {
        let host = OfflineHost::from_toml(FIXTURE).unwrap();
        let pb = host.bundles().load_bundle("Lead", "/pb/lead").unwrap();
        assert_eq!(pb.plugins.len(), 2);
        assert_eq!(pb.plugins[0].parameters["gain"].value, 0.25);
    }
}
