//! Error type for tree construction and configuration loading.
//!
//! Layout passes never fail: a missing measurement or an unparseable label
//! is logged and skipped. Only the structural API and option loading report
//! errors to the caller, together with JSON (de)serialization.

use crate::model::{ElementId, ElementKind};

/// Result alias that carries [`LayoutError`].
pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The parent does not accept children of this kind. The tree is left
    /// unchanged.
    #[error("'{child}' is not a supported child of '{parent}'")]
    UnsupportedChild {
        parent: ElementKind,
        child: ElementKind,
    },

    /// A handle that does not belong to this document.
    #[error("unknown element {0:?}")]
    UnknownElement(ElementId),

    /// Options could not be read, or a report could not be written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
