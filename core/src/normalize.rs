use crate::attribute::Attribute;
use crate::error::QueryError;
use crate::track::Track;
use serde::Serialize;

/// Per-catalog maxima used to rescale tempo and duration onto 0-100.
///
/// Built once alongside its catalog and never changed afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationIndex {
    max_tempo: u32,
    max_duration_seconds: u32,
}

impl NormalizationIndex {
    pub fn from_tracks(tracks: &[Track]) -> Self {
        tracks.iter().fold(Self::default(), |acc, t| Self {
            max_tempo: acc.max_tempo.max(t.tempo),
            max_duration_seconds: acc.max_duration_seconds.max(t.duration_secs()),
        })
    }

    pub fn max_tempo(&self) -> u32 {
        self.max_tempo
    }

    pub fn max_duration_seconds(&self) -> u32 {
        self.max_duration_seconds
    }

    pub fn tempo_percent(&self, tempo: u32) -> Option<u32> {
        rescale(tempo, self.max_tempo)
    }

    pub fn duration_percent(&self, seconds: u32) -> Option<u32> {
        rescale(seconds, self.max_duration_seconds)
    }

    /// Fails when `attribute` needs a maximum that is zero for this catalog.
    pub fn ensure_scalable(&self, attribute: Attribute) -> Result<(), QueryError> {
        let max = match attribute {
            Attribute::Percentage(_) => return Ok(()),
            Attribute::Tempo => self.max_tempo,
            Attribute::Duration => self.max_duration_seconds,
        };
        if max == 0 {
            return Err(QueryError::DegenerateNormalization { attribute });
        }
        Ok(())
    }
}

// floor division, same as the client-side colour scaling
fn rescale(value: u32, max: u32) -> Option<u32> {
    if max == 0 {
        return None;
    }
    Some((u64::from(value) * 100 / u64::from(max)) as u32)
}
