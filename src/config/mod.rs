//! Configuration for trace graph assembly
//!
//! [`GraphConfig`] carries the fixed names the context builder uses to
//! resolve capabilities and name component instances, plus the verbosity
//! handed to every component. [`TraceContext::create`](crate::TraceContext::create)
//! always uses [`GraphConfig::default`]; embedders that need different
//! plugins can load a TOML file and pass it to the builder.
//!
//! # Example file
//!
//! ```toml
//! source_plugin = "ctf"
//! source_class = "fs"
//! filter_plugin = "utils"
//! filter_class = "muxer"
//! log_level = "warning"
//! ```

use crate::error::{Result, TraceError};
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Namespace providing the trace-reading source class
pub const DEFAULT_SOURCE_PLUGIN: &str = "ctf";

/// Trace-reading source class
pub const DEFAULT_SOURCE_CLASS: &str = "fs";

/// Namespace providing the multiplexing filter class
pub const DEFAULT_FILTER_PLUGIN: &str = "utils";

/// Multiplexing filter class
pub const DEFAULT_FILTER_CLASS: &str = "muxer";

/// Source instance name
pub const DEFAULT_SOURCE_NAME: &str = "input";

/// Filter instance name
pub const DEFAULT_FILTER_NAME: &str = "muxer";

/// Sink instance name
pub const DEFAULT_SINK_NAME: &str = "simple sink";

/// Parameter key under which the source receives its trace locators
pub const DEFAULT_INPUTS_KEY: &str = "inputs";

/// Names and verbosity used to assemble a trace graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub source_plugin: String,
    pub source_class: String,
    pub filter_plugin: String,
    pub filter_class: String,
    pub source_name: String,
    pub filter_name: String,
    pub sink_name: String,
    pub inputs_key: String,
    pub log_level: LogLevel,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            source_plugin: DEFAULT_SOURCE_PLUGIN.to_string(),
            source_class: DEFAULT_SOURCE_CLASS.to_string(),
            filter_plugin: DEFAULT_FILTER_PLUGIN.to_string(),
            filter_class: DEFAULT_FILTER_CLASS.to_string(),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            filter_name: DEFAULT_FILTER_NAME.to_string(),
            sink_name: DEFAULT_SINK_NAME.to_string(),
            inputs_key: DEFAULT_INPUTS_KEY.to_string(),
            log_level: LogLevel::Info,
        }
    }
}

impl GraphConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| TraceError::Config(format!("Failed to parse graph config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TraceError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded graph config from {:?}", path);
        Ok(config)
    }

    /// Save to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TraceError::Config(format!("Failed to serialize graph config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Instance name of the `index`-th source.
    ///
    /// A single source keeps the plain name; further sources get a numeric suffix.
    pub fn source_instance_name(&self, index: usize) -> String {
        if index == 0 {
            self.source_name.clone()
        } else {
            format!("{}-{}", self.source_name, index)
        }
    }

    /// Reject empty names and instance names that would collide in one graph.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("source_plugin", &self.source_plugin),
            ("source_class", &self.source_class),
            ("filter_plugin", &self.filter_plugin),
            ("filter_class", &self.filter_class),
            ("source_name", &self.source_name),
            ("filter_name", &self.filter_name),
            ("sink_name", &self.sink_name),
            ("inputs_key", &self.inputs_key),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(TraceError::Config(format!("'{}' must not be empty", field)));
        }

        if self.source_name == self.filter_name
            || self.source_name == self.sink_name
            || self.filter_name == self.sink_name
        {
            return Err(TraceError::Config(
                "source, filter and sink instance names must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}
