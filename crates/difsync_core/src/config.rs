//! Handler configuration.

/// Configuration for a [`crate::DifHandler`].
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Canonical name of the local actor.
    ///
    /// Every outgoing update is stamped with this name; incoming updates
    /// carrying it are recognized as the handler's own echoes.
    pub actor: String,
}

impl HandlerConfig {
    /// Creates a configuration for the given local actor.
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
        }
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self::new("@local")
    }
}
