use thiserror::Error;

use crate::variant::VariantId;

/// Recoverable harness errors. Allocation and launch failures are not here:
/// those terminate the process.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("{kernel}: unknown variant id {variant}")]
    UnsupportedVariant { kernel: String, variant: VariantId },

    #[error("{kernel}: variant {variant} run before set up")]
    NotSetUp { kernel: String, variant: VariantId },

    #[error("invalid run parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
