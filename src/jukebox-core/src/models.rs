use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Location-based track identifier (absolute path or URI).
///
/// Two tracks with the same location are the same track; the id is stable
/// across runs and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Track metadata the player and the remote surface need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Every credited artist; multi-valued tags keep their order.
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Duration in seconds when known.
    pub duration_seconds: Option<u32>,
    /// Track number within album when known.
    pub track_number: Option<u32>,
    pub rating: Option<Rating>,
}

impl Track {
    /// Minimal track for a location with no tag information.
    pub fn from_location(location: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(location),
            title: title.into(),
            artists: Vec::new(),
            album: None,
            duration_seconds: None,
            track_number: None,
            rating: None,
        }
    }

    /// Text value of an attribute, `None` when the track has no value for it.
    ///
    /// Multi-valued attributes are joined with newlines.
    pub fn attr(&self, attr: TrackAttr) -> Option<String> {
        match attr {
            TrackAttr::Artist if self.artists.is_empty() => None,
            TrackAttr::Artist => Some(self.artists.join("\n")),
            TrackAttr::Title if self.title.is_empty() => None,
            TrackAttr::Title => Some(self.title.clone()),
            TrackAttr::Album => self.album.clone(),
            TrackAttr::Length => self.duration_seconds.map(|secs| secs.to_string()),
            TrackAttr::Rating => self.rating.map(|rating| rating.to_string()),
        }
    }

    /// Order two tracks by one sort column. Missing values sort first.
    pub fn cmp_by(&self, other: &Track, column: SortColumn) -> Ordering {
        fn text(value: Option<&str>) -> Option<String> {
            value.map(str::to_lowercase)
        }
        match column {
            SortColumn::Title => {
                text(Some(self.title.as_str())).cmp(&text(Some(other.title.as_str())))
            }
            SortColumn::Artist => text(self.artists.first().map(String::as_str))
                .cmp(&text(other.artists.first().map(String::as_str))),
            SortColumn::Album => {
                text(self.album.as_deref()).cmp(&text(other.album.as_deref()))
            }
            SortColumn::Length => self.duration_seconds.cmp(&other.duration_seconds),
            SortColumn::Rating => self.rating.cmp(&other.rating),
            SortColumn::TrackNumber => self.track_number.cmp(&other.track_number),
            SortColumn::Location => self.id.cmp(&other.id),
        }
    }
}

/// The track attributes reachable through the remote-control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackAttr {
    Artist,
    Title,
    Album,
    Length,
    Rating,
}

impl TrackAttr {
    pub const ALL: [TrackAttr; 5] = [
        TrackAttr::Artist,
        TrackAttr::Title,
        TrackAttr::Album,
        TrackAttr::Length,
        TrackAttr::Rating,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackAttr::Artist => "artist",
            TrackAttr::Title => "title",
            TrackAttr::Album => "album",
            TrackAttr::Length => "length",
            TrackAttr::Rating => "rating",
        }
    }

    /// Tags come from the media files; only the rating belongs to the player.
    pub fn is_settable(&self) -> bool {
        matches!(self, TrackAttr::Rating)
    }
}

impl fmt::Display for TrackAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized track attribute '{0}'")]
pub struct UnknownAttr(pub String);

impl FromStr for TrackAttr {
    type Err = UnknownAttr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackAttr::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| UnknownAttr(s.to_string()))
    }
}

/// Star rating of a track, `0..=Rating::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(Rating)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(i64::from(value))
            .ok_or_else(|| format!("rating {value} exceeds {}", Rating::MAX))
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output volume as a percentage, always within `0..=Volume::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: u8 = 100;

    /// Clamp an arbitrary level into range.
    pub fn clamped(level: i64) -> Self {
        Volume(level.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeAction {
    Increase,
    Decrease,
}

impl VolumeAction {
    /// Wire spelling of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeAction::Increase => "inc",
            VolumeAction::Decrease => "dec",
        }
    }
}

impl FromStr for VolumeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inc" => Ok(VolumeAction::Increase),
            "dec" => Ok(VolumeAction::Decrease),
            other => Err(format!("unknown volume action '{other}' (expected inc or dec)")),
        }
    }
}

/// A relative volume change, applied as one read-modify-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDelta {
    pub action: VolumeAction,
    pub amount: u32,
}

impl VolumeDelta {
    pub fn new(action: VolumeAction, amount: u32) -> Self {
        Self { action, amount }
    }

    pub fn signed(&self) -> i64 {
        match self.action {
            VolumeAction::Increase => i64::from(self.amount),
            VolumeAction::Decrease => -i64::from(self.amount),
        }
    }

    pub fn apply(&self, volume: Volume) -> Volume {
        Volume::clamped(i64::from(volume.percent()) + self.signed())
    }
}

/// Column the active queue sorts newly added tracks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Title,
    #[default]
    Artist,
    Album,
    Length,
    Rating,
    TrackNumber,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueSort {
    pub column: SortColumn,
    pub descending: bool,
}

impl QueueSort {
    pub fn new(column: SortColumn, descending: bool) -> Self {
        Self { column, descending }
    }

    /// Stable sort of a batch of tracks.
    pub fn sort(&self, tracks: &mut [Track]) {
        tracks.sort_by(|a, b| {
            let ordering = a.cmp_by(b, self.column);
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, artist: &str, length: Option<u32>) -> Track {
        Track {
            id: TrackId::new(format!("/music/{title}.mp3")),
            title: title.to_string(),
            artists: vec![artist.to_string()],
            album: None,
            duration_seconds: length,
            track_number: None,
            rating: None,
        }
    }

    #[test]
    fn attr_keys_round_trip_through_names() {
        for attr in TrackAttr::ALL {
            assert_eq!(attr.as_str().parse::<TrackAttr>(), Ok(attr));
        }
        assert_eq!(
            "bitrate".parse::<TrackAttr>(),
            Err(UnknownAttr("bitrate".into()))
        );
    }

    #[test]
    fn only_rating_is_settable() {
        let settable: Vec<_> = TrackAttr::ALL
            .into_iter()
            .filter(TrackAttr::is_settable)
            .collect();
        assert_eq!(settable, vec![TrackAttr::Rating]);
    }

    #[test]
    fn multi_valued_artists_join_with_newlines() {
        let mut t = track("song", "First", Some(200));
        t.artists.push("Second".into());
        assert_eq!(t.attr(TrackAttr::Artist).as_deref(), Some("First\nSecond"));
        assert_eq!(t.attr(TrackAttr::Length).as_deref(), Some("200"));
        assert_eq!(t.attr(TrackAttr::Album), None);
        assert_eq!(t.attr(TrackAttr::Rating), None);
    }

    #[test]
    fn rating_rejects_out_of_range() {
        assert_eq!(Rating::new(5).map(|r| r.value()), Some(5));
        assert!(Rating::new(6).is_none());
        assert!(Rating::new(-1).is_none());
    }

    #[test]
    fn volume_delta_clamps() {
        let up = VolumeDelta::new(VolumeAction::Increase, 30);
        let down = VolumeDelta::new(VolumeAction::Decrease, 30);
        assert_eq!(up.apply(Volume::clamped(90)).percent(), 100);
        assert_eq!(down.apply(Volume::clamped(10)).percent(), 0);
        assert_eq!(down.apply(up.apply(Volume::clamped(50))).percent(), 50);
        assert_eq!(Volume::clamped(70).to_string(), "70%");
    }

    #[test]
    fn volume_action_uses_wire_names() {
        assert_eq!("inc".parse::<VolumeAction>(), Ok(VolumeAction::Increase));
        assert_eq!("dec".parse::<VolumeAction>(), Ok(VolumeAction::Decrease));
        assert!("up".parse::<VolumeAction>().is_err());
    }

    #[test]
    fn queue_sort_orders_batch() {
        let mut tracks = vec![
            track("b", "Zed", Some(10)),
            track("a", "alpha", None),
            track("c", "Mid", Some(5)),
        ];
        QueueSort::new(SortColumn::Artist, false).sort(&mut tracks);
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c", "b"]);

        QueueSort::new(SortColumn::Length, true).sort(&mut tracks);
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "a"]);
    }
}
