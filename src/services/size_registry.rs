// src/services/size_registry.rs

use crate::config::RegenConfig;
use crate::persistence::SizeDefinition;

/// Source of the currently registered thumbnail sizes.
pub trait SizeRegistry {
    /// Snapshot of the registry at call time, in registration order.
    fn current_sizes(&self) -> Vec<SizeDefinition>;
}

/// Registry over a fixed list, typically taken from configuration.
#[derive(Debug, Clone)]
pub struct StaticSizeRegistry {
    sizes: Vec<SizeDefinition>,
}

impl StaticSizeRegistry {
    pub fn new(sizes: Vec<SizeDefinition>) -> Self {
        Self { sizes }
    }

    /// Registry over the sizes named in `config`.
    pub fn from_config(config: &RegenConfig) -> Self {
        Self::new(config.sizes.clone())
    }
}

impl Default for StaticSizeRegistry {
    fn default() -> Self {
        Self::new(default_sizes())
    }
}

impl SizeRegistry for StaticSizeRegistry {
    fn current_sizes(&self) -> Vec<SizeDefinition> {
        self.sizes.clone()
    }
}

pub fn default_sizes() -> Vec<SizeDefinition> {
    vec![
        SizeDefinition::new("thumbnail", Some(150), Some(150), true),
        SizeDefinition::new("medium", Some(300), Some(300), false),
        SizeDefinition::new("medium_large", Some(768), None, false),
        SizeDefinition::new("large", Some(1024), Some(1024), false),
        SizeDefinition::new("1536x1536", Some(1536), Some(1536), false),
        SizeDefinition::new("2048x2048", Some(2048), Some(2048), false),
    ]
}
