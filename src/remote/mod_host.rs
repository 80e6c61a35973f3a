use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;

use super::{PedalboardInfo, RemoteHost};
use crate::session::BYPASS_SYMBOL;

/// REST client for a MOD host (`mod-ui` web API).
pub struct ModHost {
    root: String,
    agent: ureq::Agent,
}

impl ModHost {
    pub fn new(root: &str) -> Self {
        let root = if root.ends_with('/') {
            root.to_string()
        } else {
            format!("{root}/")
        };
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(10))
            .build();
        ModHost { root, agent }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.root)
    }

    /// Parameter endpoint for a plugin instance. Instance ids are graph paths.
    fn parameter_url(&self, verb: &str, instance_id: &str, symbol: &str) -> String {
        let id = instance_id.trim_start_matches('/');
        self.url(&format!("effect/parameter/{verb}//graph/{id}/{symbol}"))
    }

    fn get_text(&self, path_or_url: &str) -> anyhow::Result<String> {
        log::debug!("GET {path_or_url}");
        let text = self
            .agent
            .get(path_or_url)
            .call()
            .with_context(|| format!("GET {path_or_url}"))?
            .into_string()?;
        Ok(text)
    }

    fn post_value(&self, url: &str, value: &str) -> anyhow::Result<()> {
        log::debug!("POST {url} value={value}");
        self.agent
            .post(url)
            .send_json(serde_json::json!({ "value": value }))
            .with_context(|| format!("POST {url}"))?;
        Ok(())
    }
}

/// Snapshot indices are the numeric keys of the host's snapshot map.
fn numeric_presets(map: BTreeMap<String, String>) -> BTreeMap<u32, String> {
    map.into_iter()
        .filter_map(|(k, v)| k.parse().ok().map(|i| (i, v)))
        .collect()
}

impl RemoteHost for ModHost {
    fn list_pedalboards(&mut self) -> anyhow::Result<Vec<PedalboardInfo>> {
        let url = self.url("pedalboard/list");
        let list = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("cannot connect to host at {url}"))?
            .into_json()?;
        Ok(list)
    }

    fn current_pedalboard_bundle(&mut self) -> anyhow::Result<Option<String>> {
        let text = self.get_text(&self.url("pedalboard/current"))?;
        let bundle = text.trim();
        Ok((!bundle.is_empty()).then(|| bundle.to_string()))
    }

    fn reset(&mut self) -> anyhow::Result<()> {
        self.get_text(&self.url("reset")).map(drop)
    }

    fn load_pedalboard(&mut self, bundle: &str) -> anyhow::Result<()> {
        let url = self.url("pedalboard/load_bundle/");
        self.agent
            .post(&url)
            .send_form(&[("bundlepath", bundle)])
            .with_context(|| format!("POST {url} bundlepath={bundle}"))?;
        Ok(())
    }

    fn save_pedalboard(&mut self, title: &str) -> anyhow::Result<()> {
        let url = self.url("pedalboard/save");
        self.agent
            .post(&url)
            .send_form(&[("asNew", "0"), ("title", title)])
            .with_context(|| format!("POST {url}"))?;
        Ok(())
    }

    fn list_presets(&mut self) -> anyhow::Result<BTreeMap<u32, String>> {
        let url = self.url("snapshot/list");
        let map: BTreeMap<String, String> = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("GET {url}"))?
            .into_json()?;
        Ok(numeric_presets(map))
    }

    fn load_preset(&mut self, index: u32) -> anyhow::Result<()> {
        self.get_text(&self.url(&format!("snapshot/load?id={index}")))
            .map(drop)
    }

    fn get_plugin_bypass(&mut self, instance_id: &str) -> anyhow::Result<bool> {
        let url = self.parameter_url("pi_stomp_get", instance_id, BYPASS_SYMBOL);
        Ok(self.get_text(&url)?.trim() == "true")
    }

    fn set_plugin_bypass(&mut self, instance_id: &str, bypassed: bool) -> anyhow::Result<()> {
        let url = self.parameter_url("pi_stomp_set", instance_id, BYPASS_SYMBOL);
        self.post_value(&url, if bypassed { "1" } else { "0" })
    }

    fn get_parameter(&mut self, instance_id: &str, symbol: &str) -> anyhow::Result<f32> {
        let url = self.parameter_url("pi_stomp_get", instance_id, symbol);
        let text = self.get_text(&url)?;
        text.trim()
            .parse()
            .with_context(|| format!("{instance_id}:{symbol} is not a number: {text:?}"))
    }

    fn set_parameter(&mut self, instance_id: &str, symbol: &str, value: f32) -> anyhow::Result<()> {
        let url = self.parameter_url("pi_stomp_set", instance_id, symbol);
        self.post_value(&url, &format!("{value:.1}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_gets_trailing_slash() {
        let host = ModHost::new("http://localhost:80");
        assert_eq!(host.url("reset"), "http://localhost:80/reset");
        let host = ModHost::new("http://pistomp.local/");
        assert_eq!(host.url("reset"), "http://pistomp.local/reset");
    }

    #[test]
    fn parameter_urls_address_graph_instances() {
        let host = ModHost::new("http://h/");
        assert_eq!(
            host.parameter_url("pi_stomp_set", "/fuzz", ":bypass"),
            "http://h/effect/parameter/pi_stomp_set//graph/fuzz/:bypass"
        );
        assert_eq!(
            host.parameter_url("pi_stomp_get", "delay_1", "time"),
            "http://h/effect/parameter/pi_stomp_get//graph/delay_1/time"
        );
    }

    #[test]
    fn only_numeric_snapshot_keys_are_presets() {
        let map = BTreeMap::from([
            ("0".to_string(), "Clean".to_string()),
            ("3".to_string(), "Lead".to_string()),
            ("current".to_string(), "x".to_string()),
        ]);
        let presets = numeric_presets(map);
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[&3], "Lead");
    }
}
