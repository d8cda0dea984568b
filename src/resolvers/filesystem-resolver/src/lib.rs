//! Resolves local paths, `file://` URIs and stream URLs into tracks.

mod scan;
mod tags;

use jukebox_core::{ResolveError, ResolveResult, Track, TrackResolver};
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use url::Url;

pub use scan::is_supported_extension;

/// What a location string denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Local(PathBuf),
    Stream(String),
}

impl Location {
    /// Only `scheme://` forms are URLs. A file name like `Artist: Song.mp3`
    /// parses as a URL too, so anything else is a path.
    fn parse(location: &str) -> ResolveResult<Self> {
        let unsupported = || ResolveError::Unsupported {
            location: location.to_string(),
        };
        if !location.contains("://") {
            return Ok(Location::Local(PathBuf::from(location)));
        }
        let url = Url::parse(location).map_err(|_| unsupported())?;
        match url.scheme() {
            "file" => url.to_file_path().map(Location::Local).map_err(|()| unsupported()),
            "http" | "https" => Ok(Location::Stream(url.to_string())),
            _ => Err(unsupported()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilesystemResolver;

impl FilesystemResolver {
    pub fn new() -> Self {
        Self
    }

    fn resolve_path(&self, path: &Path) -> ResolveResult<Vec<Track>> {
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical.clean(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "location not found");
                return Ok(Vec::new());
            }
        };

        if canonical.is_dir() {
            let tracks = scan::scan_directory(&canonical)?;
            tracing::debug!(path = %canonical.display(), count = tracks.len(), "scanned directory");
            return Ok(tracks);
        }

        match scan::scan_file(&canonical) {
            Some(track) => Ok(vec![track]),
            None => {
                tracing::warn!(path = %canonical.display(), "not a playable file");
                Ok(Vec::new())
            }
        }
    }
}

impl TrackResolver for FilesystemResolver {
    fn resolve(&self, location: &str) -> ResolveResult<Vec<Track>> {
        match Location::parse(location)? {
            Location::Local(path) => self.resolve_path(&path),
            Location::Stream(url) => Ok(vec![Track::from_location(url.clone(), url)]),
        }
    }
}
