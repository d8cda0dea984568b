use lofty::{Accessor, AudioFile, ItemKey, Probe, TaggedFileExt};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ParsedTags {
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub duration_seconds: Option<u32>,
    pub track_number: Option<u32>,
}

/// Read whatever tags the file carries. Unreadable files yield empty tags.
pub fn parse_tags(path: &Path) -> ParsedTags {
    let tagged = match Probe::open(path).and_then(|p| p.read()) {
        Ok(tagged) => tagged,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "no readable tags");
            return ParsedTags::default();
        }
    };

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
    let properties = tagged.properties();

    let title = tag.and_then(|t| t.get_string(&ItemKey::TrackTitle).map(|s| s.to_string()));
    let mut artists: Vec<String> = tag
        .map(|t| {
            t.get_strings(&ItemKey::TrackArtist)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if artists.is_empty() {
        if let Some(artist) = tag.and_then(|t| t.artist()) {
            artists.push(artist.to_string());
        }
    }
    let album = tag.and_then(|t| t.album().map(|s| s.to_string()));
    let duration_seconds = Some(properties.duration().as_secs() as u32).filter(|secs| *secs > 0);
    let track_number = tag.and_then(|t| t.track());

    ParsedTags {
        title,
        artists,
        album,
        duration_seconds,
        track_number,
    }
}
