use crate::tags::parse_tags;
use jukebox_core::{ResolveError, ResolveResult, Track, TrackId};
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub fn is_supported_extension(ext: &str) -> bool {
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "mp3" | "m4a" | "flac" | "wav" | "ogg" | "opus"
    )
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(is_supported_extension)
        .unwrap_or(false)
}

fn canonicalize_within_root(path: &Path, root: &Path) -> Option<PathBuf> {
    let Ok(canon) = path.canonicalize() else {
        return None;
    };
    let cleaned = canon.clean();
    if cleaned.starts_with(root) {
        Some(cleaned)
    } else {
        None
    }
}

/// Every playable file below `root`, in path order.
pub fn scan_directory(root: &Path) -> ResolveResult<Vec<Track>> {
    let mut tracks = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| ResolveError::Io {
            location: root.display().to_string(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !has_supported_extension(entry.path()) {
            continue;
        }
        // Symlinked files pointing outside the directory are skipped.
        if let Some(canonical) = canonicalize_within_root(entry.path(), root) {
            tracks.push(parse_track(&canonical, Some(root)));
        }
    }
    Ok(tracks)
}

/// A single file; `None` when its extension is not playable.
pub fn scan_file(path: &Path) -> Option<Track> {
    if !has_supported_extension(path) {
        return None;
    }
    Some(parse_track(path, None))
}

/// Build a track from tags, filling gaps from the layout below `root`
/// (`<artist>/<album>/<file>`).
fn parse_track(path: &Path, root: Option<&Path>) -> Track {
    let id = TrackId::new(path.to_string_lossy().to_string());

    let mut components: Vec<String> = root
        .and_then(|root| path.strip_prefix(root).ok())
        .map(|relative| {
            relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => part.to_str().map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    let _ = components.pop(); // drop file name
    let (inferred_artist, inferred_album) = match components.len() {
        0 => (None, None),
        1 => (components.pop(), None),
        _ => {
            let album = components.pop();
            (components.pop(), album)
        }
    };

    let file_stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown");

    let tags = parse_tags(path);
    let artists = if tags.artists.is_empty() {
        inferred_artist.into_iter().collect()
    } else {
        tags.artists
    };

    Track {
        id,
        title: tags.title.unwrap_or_else(|| file_stem.to_string()),
        artists,
        album: tags.album.or(inferred_album),
        duration_seconds: tags.duration_seconds,
        track_number: tags.track_number,
        rating: None,
    }
}
