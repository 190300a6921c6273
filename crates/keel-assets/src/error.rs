//! Error types of the asset pipeline.

use std::path::PathBuf;

/// Input-level failures the pipeline recovers from.
///
/// These are logged and answered with a substitute (an empty model, the
/// default texture); they never abort a load.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("texture file not found: {0}")]
    TextureNotFound(PathBuf),

    #[error("failed to decode image '{0}': {1}")]
    ImageDecodeFailed(PathBuf, String),

    #[error("embedded texture reference '{0}' does not name a texture in the scene")]
    BadEmbeddedReference(String),

    #[error("embedded texture {0} is not decodable: {1}")]
    EmbeddedDecodeFailed(usize, String),
}

/// Violations of the pipeline's own invariants.
///
/// Raised when source data breaks an assumption the pipeline depends on.
/// Returned instead of panicking, so a defective asset cannot take the
/// process down.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("bone weight targets vertex {vertex} but the mesh has {vertex_count} vertices")]
    WeightOutOfRange { vertex: u32, vertex_count: usize },
}
