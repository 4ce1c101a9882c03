// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use colored::Colorize;

use dispatch_core::domain::dispatch_config::DispatchConfigManifest;
use dispatch_core::infrastructure::registry_loader::RegistryLoader;

pub fn list(config: &DispatchConfigManifest) -> Result<()> {
    let path = &config.spec.registry.path;
    let registry = RegistryLoader::load_file(path)
        .with_context(|| format!("Failed to load agent registry from {:?}", path))?;

    if registry.is_empty() {
        println!("{}", "No agents registered.".yellow());
        return Ok(());
    }

    println!("{}", format!("{} agents ({})", registry.len(), path.display()).bold());
    for agent in registry.list_all() {
        println!("  {} {}", agent.name.bold(), format!("[{}]", agent.invocation_ref).dimmed());
        if !agent.description.is_empty() {
            println!("    {}", agent.description);
        }
        println!("    Tags: {}", agent.capability_tags.join(", "));
    }

    Ok(())
}
