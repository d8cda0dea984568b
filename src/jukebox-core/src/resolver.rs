use crate::models::Track;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to read {location}: {message}")]
    Io { location: String, message: String },
    #[error("unsupported location: {location}")]
    Unsupported { location: String },
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Turns a path or URI into the playable tracks it denotes.
///
/// A location that exists but holds nothing playable resolves to an empty
/// list rather than an error.
pub trait TrackResolver: Send + Sync {
    fn resolve(&self, location: &str) -> ResolveResult<Vec<Track>>;

    /// Resolve every location in order. A location that fails is logged and
    /// skipped so one bad path does not drop the rest of the batch.
    fn resolve_all(&self, locations: &[String]) -> Vec<Track> {
        let mut tracks = Vec::new();
        for location in locations {
            match self.resolve(location) {
                Ok(found) => tracks.extend(found),
                Err(err) => tracing::warn!(%location, error = %err, "skipping unresolvable location"),
            }
        }
        tracks
    }
}
