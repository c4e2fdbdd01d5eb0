use crate::attribute::Percentage;
use crate::error::TrackError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref DURATION_RE: Regex = Regex::new(r"^(\d+):(\d+)$").expect("valid regex");
}

/// Convert `minutes:seconds` text into a count of seconds.
pub fn duration_to_seconds(text: &str) -> Option<u32> {
    let caps = DURATION_RE.captures(text.trim())?;
    let minutes: u32 = caps[1].parse().ok()?;
    let seconds: u32 = caps[2].parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// A record as it appears in the catalog data files, before validation.
///
/// Keys follow the source exports (`spotify_track_id`, `time`, `dance`, ...); the
/// canonical attribute names are accepted too.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackRecord {
    #[serde(rename = "spotify_track_id", alias = "id")]
    pub id: String,
    pub song: String,
    pub artist: String,
    pub album: String,
    #[serde(rename = "time", alias = "duration")]
    pub duration: String,
    pub tempo: u32,
    pub popularity: u32,
    #[serde(rename = "dance", alias = "danceability")]
    pub danceability: u32,
    pub energy: u32,
    #[serde(rename = "acoustic", alias = "acousticness")]
    pub acousticness: u32,
    #[serde(rename = "instrumental", alias = "instrumentalness")]
    pub instrumentalness: u32,
    #[serde(rename = "happy", alias = "happiness")]
    pub happiness: u32,
    #[serde(rename = "speech", alias = "speechiness")]
    pub speechiness: u32,
    #[serde(rename = "live", alias = "liveness")]
    pub liveness: u32,
}

impl Default for TrackRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            song: String::new(),
            artist: String::new(),
            album: String::new(),
            duration: "0:00".to_string(),
            tempo: 0,
            popularity: 0,
            danceability: 0,
            energy: 0,
            acousticness: 0,
            instrumentalness: 0,
            happiness: 0,
            speechiness: 0,
            liveness: 0,
        }
    }
}

/// A validated, immutable catalog entry. Serializes as the public track view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TrackRecord")]
pub struct Track {
    pub id: String,
    pub song: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub tempo: u32,
    pub popularity: u32,
    pub danceability: u32,
    pub energy: u32,
    pub acousticness: u32,
    pub instrumentalness: u32,
    pub happiness: u32,
    pub speechiness: u32,
    pub liveness: u32,
    #[serde(skip)]
    duration_secs: u32,
}

impl Track {
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn percentage(&self, attribute: Percentage) -> u32 {
        match attribute {
            Percentage::Popularity => self.popularity,
            Percentage::Danceability => self.danceability,
            Percentage::Energy => self.energy,
            Percentage::Acousticness => self.acousticness,
            Percentage::Instrumentalness => self.instrumentalness,
            Percentage::Happiness => self.happiness,
            Percentage::Speechiness => self.speechiness,
            Percentage::Liveness => self.liveness,
        }
    }

    /// The three free-text fields eligible for search, in match order.
    pub fn searchable_fields(&self) -> [&str; 3] {
        [&self.song, &self.artist, &self.album]
    }
}

impl TryFrom<TrackRecord> for Track {
    type Error = TrackError;

    fn try_from(record: TrackRecord) -> Result<Self, Self::Error> {
        let id = record.id.trim().to_string();
        if id.is_empty() {
            return Err(TrackError::EmptyId);
        }
        let duration = record.duration.trim().to_string();
        let duration_secs = duration_to_seconds(&duration).ok_or_else(|| TrackError::MalformedDuration {
            id: id.clone(),
            text: record.duration.clone(),
        })?;

        let track = Track {
            song: record.song.trim().to_string(),
            artist: record.artist.trim().to_string(),
            album: record.album.trim().to_string(),
            duration,
            tempo: record.tempo,
            popularity: record.popularity,
            danceability: record.danceability,
            energy: record.energy,
            acousticness: record.acousticness,
            instrumentalness: record.instrumentalness,
            happiness: record.happiness,
            speechiness: record.speechiness,
            liveness: record.liveness,
            duration_secs,
            id,
        };

        for attribute in Percentage::ALL {
            let value = track.percentage(attribute);
            if value > 100 {
                return Err(TrackError::PercentageOutOfRange {
                    id: track.id,
                    field: attribute.name(),
                    value,
                });
            }
        }
        Ok(track)
    }
}
