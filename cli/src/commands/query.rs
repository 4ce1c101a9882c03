// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One-shot request: build the pipeline, run it once, print the JSON response.

use anyhow::{Context, Result};

use dispatch_core::application::DispatchPipeline;
use dispatch_core::domain::dispatch_config::DispatchConfigManifest;
use dispatch_core::presentation::api::flatten_paragraph;

pub async fn run(config: &DispatchConfigManifest, message: &str, session: Option<&str>) -> Result<()> {
    let pipeline = DispatchPipeline::from_config(config).context("Failed to initialize pipeline")?;

    let mut response = pipeline
        .handle_request(message, session)
        .await
        .context("Request failed")?;

    if config.spec.fuser.flatten_output {
        response.fused = flatten_paragraph(&response.fused);
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
