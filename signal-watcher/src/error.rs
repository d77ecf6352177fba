//! Error types.

use crate::reactive::NodeId;

/// Errors produced while rendering elements or evaluating computeds.
///
/// `Clone` so a failed render can be cached as the result of the computed
/// that ran it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The element's render routine failed.
    #[error("render failed: {0}")]
    Render(String),

    /// A computed read itself while it was being evaluated.
    #[error("cycle detected while evaluating computed {0}")]
    Cycle(NodeId),

    /// An element's update ran while the element was already borrowed.
    #[error("element re-entered its own update")]
    ReentrantUpdate,

    /// A tracked render outlived the element it renders.
    #[error("element was dropped before its update ran")]
    ElementDropped,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Build a render failure from any displayable message.
    pub fn render(message: impl std::fmt::Display) -> Self {
        Self::Render(message.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            Error::render("template missing").to_string(),
            "render failed: template missing"
        );
        assert_eq!(
            Error::ReentrantUpdate.to_string(),
            "element re-entered its own update"
        );
        assert_eq!(
            Error::Config("max_passes must be at least 1".into()).to_string(),
            "invalid configuration: max_passes must be at least 1"
        );
    }
}
