// src/app_logic/mod.rs

pub mod embed_rewriter;
pub mod reconciler;
pub mod regenerator;
pub mod thumbnail_resolver;
pub mod usage_propagator;
