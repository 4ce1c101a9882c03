// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use dispatch_core::domain::dispatch_config::DispatchConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./dispatch-config.yaml)
        #[arg(short, long, default_value = "./dispatch-config.yaml")]
        output: PathBuf,

        /// Include LLM providers and commented options
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = DispatchConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. DISPATCH_CONFIG_PATH: {}",
            std::env::var("DISPATCH_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./dispatch-config.yaml");
        println!("  4. ~/.dispatch/config.yaml");
        println!("  5. /etc/dispatch/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", config.to_yaml_string()?);
        return Ok(());
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Node: {}", config.metadata.name);
    println!("  Registry: {}", spec.registry.path.display());
    println!();

    println!("{}", "Pipeline:".bold());
    println!("  Top K: {}", spec.selector.top_k);
    println!(
        "  Classifier: {}",
        spec.selector.classifier_model.as_deref().unwrap_or("(keyword matching)")
    );
    println!(
        "  Memory: {}",
        if spec.selector.use_memory {
            format!("{} turns per session", spec.selector.memory_capacity)
        } else {
            "disabled".to_string()
        }
    );
    println!("  Time budget: {:?}", spec.dispatcher.time_budget);
    println!("  Timeout policy: {:?}", spec.dispatcher.timeout_policy);
    println!("  Fusion: {:?}", spec.fuser.mode);
    if let Some(model) = &spec.fuser.model {
        println!("  Fusion model: {}", model);
    }
    println!();

    println!("{}", "LLM Providers:".bold());
    if spec.llm_providers.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for provider in &spec.llm_providers {
        let state = if provider.enabled { "" } else { " [disabled]" };
        println!("  {} ({}){}", provider.name.bold(), provider.provider_type, state);
        println!("    Endpoint: {}", provider.endpoint);
        for model in &provider.models {
            println!("      - {} → {}", model.alias, model.model);
        }
    }
    if let Some(fallback) = &spec.llm_selection.fallback_provider {
        println!("  Fallback provider: {}", fallback);
    }
    println!();

    println!("{}", "Network:".bold());
    println!("  Listen: {}:{}", spec.network.bind_address, spec.network.port);

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = DispatchConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/dispatch-config.yaml").to_string()
    } else {
        DispatchConfigManifest::default().to_yaml_string()?
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_template_is_valid() {
        let config = DispatchConfigManifest::from_yaml_str(include_str!("../../templates/dispatch-config.yaml"))
            .unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_generate_writes_loadable_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dispatch-config.yaml");
        generate(path.clone(), false).unwrap();

        let config = DispatchConfigManifest::from_yaml_file(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.spec.selector.top_k, 3);
    }
}
