use crate::error::QueryError;
use crate::normalize::NormalizationIndex;
use crate::track::Track;
use std::fmt;
use std::str::FromStr;

/// Attributes stored on a 0-100 scale that score without rescaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Percentage {
    Popularity,
    Danceability,
    Energy,
    Acousticness,
    Instrumentalness,
    Happiness,
    Speechiness,
    Liveness,
}

impl Percentage {
    pub const ALL: [Percentage; 8] = [
        Percentage::Popularity,
        Percentage::Danceability,
        Percentage::Energy,
        Percentage::Acousticness,
        Percentage::Instrumentalness,
        Percentage::Happiness,
        Percentage::Speechiness,
        Percentage::Liveness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Percentage::Popularity => "popularity",
            Percentage::Danceability => "danceability",
            Percentage::Energy => "energy",
            Percentage::Acousticness => "acousticness",
            Percentage::Instrumentalness => "instrumentalness",
            Percentage::Happiness => "happiness",
            Percentage::Speechiness => "speechiness",
            Percentage::Liveness => "liveness",
        }
    }
}

/// A sortable attribute, each variant carrying its own normalization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    Percentage(Percentage),
    Tempo,
    Duration,
}

impl Attribute {
    pub const ALL: [Attribute; 10] = [
        Attribute::Duration,
        Attribute::Percentage(Percentage::Popularity),
        Attribute::Percentage(Percentage::Danceability),
        Attribute::Percentage(Percentage::Energy),
        Attribute::Percentage(Percentage::Happiness),
        Attribute::Percentage(Percentage::Acousticness),
        Attribute::Percentage(Percentage::Instrumentalness),
        Attribute::Percentage(Percentage::Speechiness),
        Attribute::Percentage(Percentage::Liveness),
        Attribute::Tempo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Percentage(p) => p.name(),
            Attribute::Tempo => "tempo",
            Attribute::Duration => "duration",
        }
    }

    /// Resolve a canonical name or one of the short form-field names (`time`, `dance`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let attribute = match name.trim().to_ascii_lowercase().as_str() {
            "popularity" => Attribute::Percentage(Percentage::Popularity),
            "danceability" | "dance" => Attribute::Percentage(Percentage::Danceability),
            "energy" => Attribute::Percentage(Percentage::Energy),
            "acousticness" | "acoustic" => Attribute::Percentage(Percentage::Acousticness),
            "instrumentalness" | "instrumental" => Attribute::Percentage(Percentage::Instrumentalness),
            "happiness" | "happy" => Attribute::Percentage(Percentage::Happiness),
            "speechiness" | "speech" => Attribute::Percentage(Percentage::Speechiness),
            "liveness" | "live" => Attribute::Percentage(Percentage::Liveness),
            "tempo" => Attribute::Tempo,
            "duration" | "time" => Attribute::Duration,
            _ => return None,
        };
        Some(attribute)
    }

    /// Value of this attribute for `track` on the 0-100 scale.
    pub fn normalized(self, track: &Track, index: &NormalizationIndex) -> Result<u32, QueryError> {
        match self {
            Attribute::Percentage(p) => Ok(track.percentage(p)),
            Attribute::Tempo => index
                .tempo_percent(track.tempo)
                .ok_or(QueryError::DegenerateNormalization { attribute: self }),
            Attribute::Duration => index
                .duration_percent(track.duration_secs())
                .ok_or(QueryError::DegenerateNormalization { attribute: self }),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::from_name(s).ok_or_else(|| QueryError::invalid(format!("unknown attribute {s:?}")))
    }
}
