//! Resolver configuration.

/// Default depth bound for the `could_satisfy` look-ahead.
pub const DEFAULT_LOOKAHEAD_DEPTH: usize = 32;

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How many dependency levels candidate pruning looks ahead.
    pub max_lookahead_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_lookahead_depth: DEFAULT_LOOKAHEAD_DEPTH,
        }
    }
}

impl ResolverConfig {
    /// Set the look-ahead depth.
    #[must_use]
    pub const fn with_lookahead_depth(mut self, depth: usize) -> Self {
        self.max_lookahead_depth = depth;
        self
    }
}
