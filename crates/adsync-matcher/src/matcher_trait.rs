use adsync_core::{AudioSample, MatchError, MatchRequest, MatchResult, MediaSource};
use async_trait::async_trait;

/// Resolves a matched clip to a playable audio-description source.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn resolve_source(&self, clip_id: &str, lang: &str) -> Result<MediaSource, MatchError>;
}

/// External fingerprint matcher: identifies which clip a room sample came from
/// and where in that clip the sample started.
///
/// Implementations are registered via [`MatcherRegistry`](crate::MatcherRegistry).
#[async_trait]
pub trait Matcher: Catalog {
    /// Returns the matcher's plugin name (e.g. `"fixed"`, `"http"`).
    fn name(&self) -> &str;
    /// One-time initialisation with matcher-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), MatchError>;
    async fn match_sample(
        &self,
        sample: &AudioSample,
        request: &MatchRequest,
    ) -> Result<MatchResult, MatchError>;
    async fn shutdown(&self) -> Result<(), MatchError>;
}
