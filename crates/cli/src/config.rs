//! `propshape.toml`: extra shape definitions, declarative alteration
//! overrides and widget transforms.

use std::collections::BTreeMap;
use std::path::Path;

use propshape_core::{
    AlterRegistry, DeclarativeOverride, DefinitionRegistry, Resolver, WidgetTransformRegistry,
};
use serde::Deserialize;

/// File looked up in the working directory when `--config` is not given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "propshape.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default)]
    pub definitions: Vec<DefinitionEntry>,
    #[serde(default)]
    pub alter: Vec<DeclarativeOverride>,
    #[serde(default)]
    pub widget_transforms: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DefinitionEntry {
    pub uri: String,
    pub schema: serde_json::Value,
}

impl Config {
    /// Load `explicit`, or `./propshape.toml` if it exists, or the defaults.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Config, String> {
        let path = match explicit {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Config::default()),
        };
        let src = std::fs::read_to_string(path)
            .map_err(|e| format!("error reading config '{}': {}", path.display(), e))?;
        let config = Config::parse(&src)
            .map_err(|e| format!("error in config '{}': {}", path.display(), e))?;
        tracing::debug!(
            path = %path.display(),
            definitions = config.definitions.len(),
            overrides = config.alter.len(),
            "loaded config"
        );
        Ok(config)
    }

    pub(crate) fn parse(src: &str) -> Result<Config, String> {
        let config: Config = toml::from_str(src).map_err(|e| e.to_string())?;
        // Fail early on bad definitions rather than at first use.
        config.definitions()?;
        Ok(config)
    }

    pub(crate) fn definitions(&self) -> Result<DefinitionRegistry, String> {
        let mut registry = DefinitionRegistry::with_builtins();
        for entry in &self.definitions {
            registry
                .register(entry.uri.clone(), entry.schema.clone())
                .map_err(|e| format!("definition '{}': {}", entry.uri, e))?;
        }
        Ok(registry)
    }

    pub(crate) fn resolver(&self) -> Result<Resolver, String> {
        let mut alter = AlterRegistry::new();
        alter.extend_overrides(self.alter.iter().cloned());
        Ok(Resolver::new(self.definitions()?, alter.freeze()))
    }

    pub(crate) fn widget_transforms(&self) -> WidgetTransformRegistry {
        let mut registry = WidgetTransformRegistry::with_builtins();
        for (widget, transforms) in &self.widget_transforms {
            registry.register(widget.clone(), transforms.iter().cloned());
        }
        registry
    }
}
