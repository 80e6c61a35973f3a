use std::collections::BTreeMap;

use crate::remote::{BundleReader, RemoteHost};
use crate::session::Pedalboard;


pub fn pedalboards(host: &mut dyn RemoteHost) -> anyhow::Result<()> {
    println!("=== Pedalboards ===");
    let current = host.current_pedalboard_bundle()?;
    let list = host.list_pedalboards()?;
    if list.is_empty() {
        println!("  (none found)");
    }
    for pb in &list {
        let marker = if current.as_deref() == Some(pb.bundle.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {}", pb.title);
        println!("    {}", pb.bundle);
    }
    Ok(())
}

pub fn presets(host: &mut dyn RemoteHost) -> anyhow::Result<()> {
    let current = host.current_pedalboard_bundle()?;
    println!(
        "=== Presets of {} ===",
        current.as_deref().unwrap_or("(no pedalboard loaded)")
    );
    let presets = host.list_presets()?;
    if presets.is_empty() {
        println!("  (none)");
    }
    for (index, name) in &presets {
        println!("  [{index}] {name}");
    }
    Ok(())
}

pub fn describe(
    host: &mut dyn RemoteHost,
    bundles: &dyn BundleReader,
    bundle: &str,
) -> anyhow::Result<()> {
    let title = host
        .list_pedalboards()?
        .into_iter()
        .find(|pb| pb.bundle == bundle)
        .map(|pb| pb.title)
        .ok_or_else(|| anyhow::anyhow!("host does not know bundle {bundle}"))?;
    let pb = bundles.load_bundle(&title, bundle)?;
    let live = live_values(host, &pb)?;

    println!("{}", pb.title);
    println!("  Bundle:  {}", pb.bundle);
    println!("  Plugins: {}", pb.plugins.len());
    for plugin in &pb.plugins {
        println!(
            "    {} ({}){}",
            plugin.instance_id,
            if plugin.category.is_empty() {
                "uncategorized"
            } else {
                &plugin.category
            },
            if plugin.bypassed { " [bypassed]" } else { "" }
        );
        for param in plugin.parameters.values() {
            let binding = param
                .binding
                .as_deref()
                .map(|b| format!(", bound to {b}"))
                .unwrap_or_default();
            let now = live
                .get(&(plugin.instance_id.clone(), param.symbol.clone()))
                .map(|v| format!(", live={v}"))
                .unwrap_or_default();
            println!(
                "      {} {} (min={}, max={}, value={}{now}{binding})",
                param.symbol, param.name, param.minimum, param.maximum, param.value
            );
        }
    }
    Ok(())
}

/// Values the host currently holds, keyed by instance id and symbol. Empty
/// unless `pb` is the pedalboard the host has loaded.
fn live_values(
    host: &mut dyn RemoteHost,
    pb: &Pedalboard,
) -> anyhow::Result<BTreeMap<(String, String), f32>> {
    let mut values = BTreeMap::new();
    if host.current_pedalboard_bundle()?.as_deref() != Some(pb.bundle.as_str()) {
        return Ok(values);
    }
    for plugin in &pb.plugins {
        for symbol in plugin.parameters.keys() {
            match host.get_parameter(&plugin.instance_id, symbol) {
                Ok(v) => {
                    values.insert((plugin.instance_id.clone(), symbol.clone()), v);
                }
                Err(e) => log::warn!("{}:{symbol}: {e:#}", plugin.instance_id),
            }
        }
    }
    Ok(values)
}
