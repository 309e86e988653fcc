//! Thumbnail regeneration for a single source image, plus rewriting of the
//! markup that embeds those thumbnails in other documents.

pub mod app_logic;
pub mod config;
pub mod error;
pub mod persistence;
pub mod services;
pub mod thumbnail;

#[cfg(test)]
mod tests_common;

pub use app_logic::embed_rewriter::{EmbedPatterns, ResolvedThumbnail, Rewrite, rewrite_embeds};
pub use app_logic::reconciler::{Reconciler, Reconciliation, SourceImage};
pub use app_logic::regenerator::{RegenerationReport, Regenerator};
pub use app_logic::usage_propagator::{DocumentFilter, UsagePropagator, UsageReport};
pub use config::{RegenConfig, RegenerateArgs};
pub use error::{ErrorCode, RegenerateError, ThumbnailError, UsageError};
