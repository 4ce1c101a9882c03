// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Dispatch Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) covering:
// - Agent registry location
// - Selector, dispatcher and fuser settings
// - LLM provider configuration and model aliases
// - Network and observability settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::memory::DEFAULT_MEMORY_CAPACITY;

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const CONFIG_KIND: &str = "DispatchConfig";

/// Upper bound on model retries; backoff doubles per attempt.
pub const MAX_LLM_RETRIES: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfigManifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: DispatchConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfigSpec {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub selector: SelectorConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub fuser: FuserConfig,

    #[serde(default)]
    pub llm_providers: Vec<LLMProviderConfig>,

    #[serde(default)]
    pub llm_selection: LLMSelection,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the agent registry (JSON, or YAML by extension)
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Maximum number of agents invoked per request
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Model alias used for classification. Unset disables the classifier,
    /// leaving only keyword selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier_model: Option<String>,

    /// Prefix classifier prompts with recent exchanges
    #[serde(default = "default_true")]
    pub use_memory: bool,

    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            classifier_model: None,
            use_memory: true,
            memory_capacity: default_memory_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Deadline for the whole provider batch (e.g. "5s", "750ms")
    #[serde(with = "humantime_serde", default = "default_time_budget")]
    pub time_budget: Duration,

    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            time_budget: default_time_budget(),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

/// What a batch that misses its deadline returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// One synthetic `unknown`/`timeout` result; finished work is dropped
    #[default]
    Discard,
    /// Finished results in shortlist order, `timeout` failures for the rest
    KeepCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuserConfig {
    #[serde(default)]
    pub mode: FusionMode,

    /// Model alias for synthesis mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Collapse multi-line fused output into one paragraph at the HTTP/CLI boundary
    #[serde(default = "default_true")]
    pub flatten_output: bool,
}

impl Default for FuserConfig {
    fn default() -> Self {
        Self {
            mode: FusionMode::default(),
            model: None,
            flatten_output: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    #[default]
    Deterministic,
    Synthesis,
}

impl std::str::FromStr for FusionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deterministic" | "mock" => Ok(FusionMode::Deterministic),
            "synthesis" | "llm" => Ok(FusionMode::Synthesis),
            other => Err(format!("unknown fusion mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMProviderConfig {
    /// Unique provider name (e.g., "gemini", "ollama-local")
    pub name: String,

    /// "openai", "openai-compatible", "ollama" or "gemini"
    #[serde(rename = "type")]
    pub provider_type: String,

    pub endpoint: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Alias referenced by the selector, fuser and `llm:` agents
    pub alias: String,

    /// Model identifier for the provider API
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMSelection {
    /// Provider tried once more after the last failed attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for LLMSelection {
    fn default() -> Self {
        Self {
            fallback_provider: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_registry_path() -> PathBuf {
    PathBuf::from("data/agents_registry.json")
}

fn default_top_k() -> usize {
    3
}

fn default_memory_capacity() -> usize {
    DEFAULT_MEMORY_CAPACITY
}

fn default_time_budget() -> Duration {
    Duration::from_secs(5)
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for DispatchConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "dispatch-node".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: DispatchConfigSpec::default(),
        }
    }
}

impl DispatchConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. DISPATCH_CONFIG_PATH environment variable
    /// 2. ./dispatch-config.yaml
    /// 3. ~/.dispatch/config.yaml
    /// 4. /etc/dispatch/config.yaml (Unix) or C:\ProgramData\Dispatch\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("DISPATCH_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./dispatch-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".dispatch").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/dispatch/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Dispatch\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, falling back to defaults.
    /// An explicit path that cannot be loaded is an error.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `DISPATCH_*` overrides read through `lookup`. Invalid values are
    /// logged and ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("DISPATCH_TIME_BUDGET_MS") {
            match val.trim().parse::<u64>() {
                Ok(ms) => {
                    tracing::info!("Environment override: DISPATCH_TIME_BUDGET_MS={}", ms);
                    self.spec.dispatcher.time_budget = Duration::from_millis(ms);
                }
                Err(_) => tracing::warn!(
                    "Invalid value for DISPATCH_TIME_BUDGET_MS: '{}'. Expected milliseconds. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("DISPATCH_FUSION_MODE") {
            match val.parse::<FusionMode>() {
                Ok(mode) => {
                    tracing::info!("Environment override: DISPATCH_FUSION_MODE={:?}", mode);
                    self.spec.fuser.mode = mode;
                }
                Err(e) => tracing::warn!("Invalid value for DISPATCH_FUSION_MODE: {}. Ignoring.", e),
            }
        }

        if let Some(val) = lookup("DISPATCH_TOP_K") {
            match val.trim().parse::<usize>() {
                Ok(top_k) => {
                    tracing::info!("Environment override: DISPATCH_TOP_K={}", top_k);
                    self.spec.selector.top_k = top_k;
                }
                Err(_) => tracing::warn!("Invalid value for DISPATCH_TOP_K: '{}'. Ignoring.", val),
            }
        }
    }

    /// All aliases offered by enabled providers.
    pub fn model_aliases(&self) -> Vec<&str> {
        self.spec
            .llm_providers
            .iter()
            .filter(|p| p.enabled)
            .flat_map(|p| p.models.iter().map(|m| m.alias.as_str()))
            .collect()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != CONFIG_KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, CONFIG_KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.selector.top_k == 0 {
            anyhow::bail!("spec.selector.top_k must be at least 1");
        }

        if self.spec.dispatcher.time_budget.is_zero() {
            anyhow::bail!("spec.dispatcher.time_budget must be greater than zero");
        }

        for provider in &self.spec.llm_providers {
            if provider.name.is_empty() {
                anyhow::bail!("LLM provider name cannot be empty");
            }
            if provider.endpoint.is_empty() {
                anyhow::bail!("LLM provider endpoint cannot be empty for: {}", provider.name);
            }
            if provider.models.is_empty() {
                anyhow::bail!("LLM provider must have at least one model: {}", provider.name);
            }
            for model in &provider.models {
                if model.alias.is_empty() {
                    anyhow::bail!("Model alias cannot be empty in provider: {}", provider.name);
                }
                if model.model.is_empty() {
                    anyhow::bail!("Model identifier cannot be empty for alias: {}", model.alias);
                }
            }
        }

        let aliases = self.model_aliases();

        if let Some(alias) = &self.spec.selector.classifier_model {
            if !aliases.contains(&alias.as_str()) {
                anyhow::bail!("Classifier model alias '{}' not found in llm_providers", alias);
            }
        }

        if self.spec.fuser.mode == FusionMode::Synthesis {
            match &self.spec.fuser.model {
                None => anyhow::bail!("spec.fuser.model is required in synthesis mode"),
                Some(alias) if !aliases.contains(&alias.as_str()) => {
                    anyhow::bail!("Fuser model alias '{}' not found in llm_providers", alias)
                }
                Some(_) => {}
            }
        }

        if self.spec.llm_selection.max_retries > MAX_LLM_RETRIES {
            anyhow::bail!(
                "spec.llm_selection.max_retries must be at most {}",
                MAX_LLM_RETRIES
            );
        }

        if let Some(fallback) = &self.spec.llm_selection.fallback_provider {
            if !self.spec.llm_providers.iter().any(|p| &p.name == fallback) {
                anyhow::bail!("Fallback provider '{}' not found in llm_providers", fallback);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: 100monkeys.ai/v1
kind: DispatchConfig
metadata:
  name: test-node
spec:
  registry:
    path: data/agents.json
  selector:
    top_k: 2
    classifier_model: fast
  dispatcher:
    time_budget: 750ms
    timeout_policy: keep_completed
  fuser:
    mode: synthesis
    model: fast
  llm_providers:
    - name: gemini
      type: gemini
      endpoint: https://generativelanguage.googleapis.com
      api_key: env:GEMINI_API_KEY
      models:
        - alias: fast
          model: gemini-2.5-flash-lite
"#;

    #[test]
    fn test_default_manifest() {
        let manifest = DispatchConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, CONFIG_KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.selector.top_k, 3);
        assert_eq!(manifest.spec.dispatcher.time_budget, Duration::from_secs(5));
        assert_eq!(manifest.spec.dispatcher.timeout_policy, TimeoutPolicy::Discard);
        assert_eq!(manifest.spec.fuser.mode, FusionMode::Deterministic);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_full_manifest() {
        let manifest = DispatchConfigManifest::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(manifest.metadata.name, "test-node");
        assert_eq!(manifest.spec.registry.path, PathBuf::from("data/agents.json"));
        assert_eq!(manifest.spec.selector.top_k, 2);
        assert_eq!(manifest.spec.selector.memory_capacity, DEFAULT_MEMORY_CAPACITY);
        assert_eq!(manifest.spec.dispatcher.time_budget, Duration::from_millis(750));
        assert_eq!(manifest.spec.dispatcher.timeout_policy, TimeoutPolicy::KeepCompleted);
        assert_eq!(manifest.spec.fuser.mode, FusionMode::Synthesis);
        assert_eq!(manifest.model_aliases(), vec!["fast"]);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut manifest = DispatchConfigManifest::from_yaml_str(SAMPLE).unwrap();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = CONFIG_KIND.to_string();

        manifest.spec.selector.top_k = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.selector.top_k = 3;

        manifest.spec.dispatcher.time_budget = Duration::ZERO;
        assert!(manifest.validate().is_err());
        manifest.spec.dispatcher.time_budget = Duration::from_secs(1);

        manifest.spec.fuser.model = Some("smart".to_string());
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("Fuser model alias 'smart'"));
        manifest.spec.fuser.model = None;
        assert!(manifest.validate().is_err());
        manifest.spec.fuser.mode = FusionMode::Deterministic;

        manifest.spec.selector.classifier_model = Some("missing".to_string());
        assert!(manifest.validate().is_err());
        manifest.spec.selector.classifier_model = None;

        manifest.spec.llm_selection.max_retries = 64;
        assert!(manifest.validate().is_err());
        manifest.spec.llm_selection.max_retries = MAX_LLM_RETRIES;

        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut manifest = DispatchConfigManifest::default();
        manifest.apply_overrides_from(|key| match key {
            "DISPATCH_TIME_BUDGET_MS" => Some("250".to_string()),
            "DISPATCH_FUSION_MODE" => Some("synthesis".to_string()),
            "DISPATCH_TOP_K" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(manifest.spec.dispatcher.time_budget, Duration::from_millis(250));
        assert_eq!(manifest.spec.fuser.mode, FusionMode::Synthesis);
        assert_eq!(manifest.spec.selector.top_k, 3);
    }

    #[test]
    fn test_explicit_missing_path_is_fatal() {
        let result = DispatchConfigManifest::load_or_default(Some(PathBuf::from(
            "/nonexistent/dispatch-config.yaml",
        )));
        assert!(result.is_err());
    }
}
