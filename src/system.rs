use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process::Command;

use crate::config::{AudioConfig, SystemConfig};

/// `key=value` pairs reported by the wifi status query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WifiStatus(BTreeMap<String, String>);

impl WifiStatus {
    pub fn parse(output: &str) -> Self {
        let entries = output
            .lines()
            .filter_map(|line| line.split_once('='))
            .filter(|(k, v)| !k.trim().is_empty() && !v.trim().is_empty())
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        WifiStatus(entries)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn hotspot_active(&self) -> bool {
        self.get("hotspot_active") == Some("1")
    }
}

/// Mixer controls of the audio card (input gain, headphone volume).
pub trait AudioCard {
    fn capture_control(&self) -> &str;
    fn master_control(&self) -> &str;
    fn get_parameter(&mut self, control: &str) -> anyhow::Result<f32>;
    fn set_parameter(&mut self, control: &str, value: f32) -> anyhow::Result<()>;
}

/// Operating-system level actions. All fire-and-forget from the UI's point of view.
pub trait SystemControl {
    fn shutdown(&mut self) -> anyhow::Result<()>;
    fn reboot(&mut self) -> anyhow::Result<()>;
    fn restart_audio(&mut self) -> anyhow::Result<()>;
    fn wifi_status(&mut self) -> anyhow::Result<WifiStatus>;
    fn set_hotspot(&mut self, enabled: bool) -> anyhow::Result<()>;
    /// `git describe` style version string of the installed software.
    fn software_version(&mut self) -> anyhow::Result<String>;
}

fn run_shell(cmd: &str) -> anyhow::Result<String> {
    let output = Command::new("sh").arg("-c").arg(cmd).output()?;
    if !output.status.success() {
        anyhow::bail!("`{cmd}` exited with {}", output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// ALSA mixer driven through `amixer`.
pub struct AmixerCard {
    card: String,
    capture: String,
    master: String,
}

impl AmixerCard {
    pub fn new(cfg: &AudioConfig) -> Self {
        AmixerCard {
            card: cfg.card.clone(),
            capture: cfg.capture_control.clone(),
            master: cfg.master_control.clone(),
        }
    }
}

/// First `[<n>dB]` figure in `amixer sget` output.
pub fn parse_amixer_db(output: &str) -> Option<f32> {
    output
        .split('[')
        .filter_map(|chunk| chunk.split_once("dB]"))
        .find_map(|(num, _)| num.parse().ok())
}

impl AudioCard for AmixerCard {
    fn capture_control(&self) -> &str {
        &self.capture
    }

    fn master_control(&self) -> &str {
        &self.master
    }

    fn get_parameter(&mut self, control: &str) -> anyhow::Result<f32> {
        let output = Command::new("amixer")
            .args(["-c", &self.card, "sget", control])
            .output()?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_amixer_db(&text)
            .ok_or_else(|| anyhow::anyhow!("no dB value for {control} in amixer output"))
    }

    fn set_parameter(&mut self, control: &str, value: f32) -> anyhow::Result<()> {
        let status = Command::new("amixer")
            .args(["-q", "-c", &self.card, "sset", control, &format!("{value}dB")])
            .status()?;
        if !status.success() {
            anyhow::bail!("amixer sset {control} exited with {status}");
        }
        Ok(())
    }
}

/// In-memory mixer for running without audio hardware.
#[derive(Default)]
pub struct MemoryCard {
    values: HashMap<String, f32>,
}

impl AudioCard for MemoryCard {
    fn capture_control(&self) -> &str {
        "Capture"
    }

    fn master_control(&self) -> &str {
        "Master"
    }

    fn get_parameter(&mut self, control: &str) -> anyhow::Result<f32> {
        Ok(self.values.get(control).copied().unwrap_or(0.0))
    }

    fn set_parameter(&mut self, control: &str, value: f32) -> anyhow::Result<()> {
        log::debug!("{control} = {value}");
        self.values.insert(control.to_string(), value);
        Ok(())
    }
}

/// Runs the configured shell command lines.
pub struct ShellSystem {
    shutdown: String,
    reboot: String,
    restart_audio: String,
    wifi_status: String,
    hotspot_up: String,
    hotspot_down: String,
    homedir: PathBuf,
}

impl ShellSystem {
    pub fn new(cfg: &SystemConfig) -> Self {
        ShellSystem {
            shutdown: cfg.shutdown.clone(),
            reboot: cfg.reboot.clone(),
            restart_audio: cfg.restart_audio.clone(),
            wifi_status: cfg.wifi_status.clone(),
            hotspot_up: cfg.hotspot_up.clone(),
            hotspot_down: cfg.hotspot_down.clone(),
            homedir: cfg.homedir.clone(),
        }
    }
}

impl SystemControl for ShellSystem {
    fn shutdown(&mut self) -> anyhow::Result<()> {
        run_shell(&self.shutdown).map(drop)
    }

    fn reboot(&mut self) -> anyhow::Result<()> {
        run_shell(&self.reboot).map(drop)
    }

    fn restart_audio(&mut self) -> anyhow::Result<()> {
        run_shell(&self.restart_audio).map(drop)
    }

    fn wifi_status(&mut self) -> anyhow::Result<WifiStatus> {
        Ok(WifiStatus::parse(&run_shell(&self.wifi_status)?))
    }

    fn set_hotspot(&mut self, enabled: bool) -> anyhow::Result<()> {
        let cmd = if enabled { &self.hotspot_up } else { &self.hotspot_down };
        run_shell(cmd).map(drop)
    }

    fn software_version(&mut self) -> anyhow::Result<String> {
        let git_dir = self.homedir.join(".git");
        let output = Command::new("git")
            .arg("--git-dir")
            .arg(&git_dir)
            .arg("--work-tree")
            .arg(&self.homedir)
            .arg("describe")
            .output()?;
        if !output.status.success() {
            anyhow::bail!("git describe failed in {}", self.homedir.display());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Logs requested actions instead of performing them.
#[derive(Default)]
pub struct NullSystem {
    hotspot: bool,
}

impl SystemControl for NullSystem {
    fn shutdown(&mut self) -> anyhow::Result<()> {
        log::info!("(offline) shutdown requested");
        Ok(())
    }

    fn reboot(&mut self) -> anyhow::Result<()> {
        log::info!("(offline) reboot requested");
        Ok(())
    }

    fn restart_audio(&mut self) -> anyhow::Result<()> {
        log::info!("(offline) audio restart requested");
        Ok(())
    }

    fn wifi_status(&mut self) -> anyhow::Result<WifiStatus> {
        let mut status = WifiStatus::default();
        status.insert("hotspot_active", if self.hotspot { "1" } else { "0" });
        Ok(status)
    }

    fn set_hotspot(&mut self, enabled: bool) -> anyhow::Result<()> {
        self.hotspot = enabled;
        Ok(())
    }

    fn software_version(&mut self) -> anyhow::Result<String> {
        Ok(format!("v{}-offline", env!("CARGO_PKG_VERSION")))
    }
}

/// Release tag part of a describe string (`v1.2-5-gabc` → `v1.2`).
pub fn version_from_describe(describe: &str) -> &str {
    describe.split('-').next().unwrap_or(describe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_status_parses_key_values() {
        let status = WifiStatus::parse("hotspot_active=1\nip_address=10.0.0.2\n\nbroken\nempty=\n");
        assert!(status.hotspot_active());
        assert_eq!(status.get("ip_address"), Some("10.0.0.2"));
        assert_eq!(status.get("empty"), None);
    }

    #[test]
    fn amixer_db_figure() {
        let out = "Simple mixer control 'Master',0\n  Front Left: Playback 100 [79%] [-3.50dB] [on]\n";
        assert_eq!(parse_amixer_db(out), Some(-3.5));
        assert_eq!(parse_amixer_db("Mono: [on]"), None);
    }

    #[test]
    fn version_is_tag_before_dash() {
        assert_eq!(version_from_describe("v1.2-5-gabc123"), "v1.2");
        assert_eq!(version_from_describe("v2.0"), "v2.0");
    }

    #[test]
    fn memory_card_round_trips_values() {
        let mut card = MemoryCard::default();
        assert_eq!(card.get_parameter("Master").unwrap(), 0.0);
        card.set_parameter("Master", -6.0).unwrap();
        assert_eq!(card.get_parameter("Master").unwrap(), -6.0);
    }

    #[test]
    fn null_system_tracks_hotspot() {
        let mut sys = NullSystem::default();
        assert!(!sys.wifi_status().unwrap().hotspot_active());
        sys.set_hotspot(true).unwrap();
        assert!(sys.wifi_status().unwrap().hotspot_active());
    }
}
