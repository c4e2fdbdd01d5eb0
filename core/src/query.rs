use crate::attribute::Attribute;
use crate::error::QueryError;
use crate::normalize::NormalizationIndex;
use crate::track::Track;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Sparse attribute weights. Only non-zero weights are stored, so "no weights active"
/// is an emptiness check. Iteration order is fixed, which keeps score sums reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weights(BTreeMap<Attribute, f64>);

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a weight in [-1, 1]; a zero weight clears the attribute.
    pub fn set(&mut self, attribute: Attribute, weight: f64) -> Result<(), QueryError> {
        if !weight.is_finite() || !(-1.0..=1.0).contains(&weight) {
            return Err(QueryError::invalid(format!("weight for {attribute} must be within [-1, 1], got {weight}")));
        }
        if weight == 0.0 {
            self.0.remove(&attribute);
        } else {
            self.0.insert(attribute, weight);
        }
        Ok(())
    }

    pub fn with(mut self, attribute: Attribute, weight: f64) -> Result<Self, QueryError> {
        self.set(attribute, weight)?;
        Ok(self)
    }

    /// Build from `(attribute name, weight)` pairs, e.g. decoded form fields.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut weights = Self::new();
        for (name, weight) in pairs {
            weights.set(name.as_ref().parse()?, weight)?;
        }
        Ok(weights)
    }

    pub fn get(&self, attribute: Attribute) -> f64 {
        self.0.get(&attribute).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        self.0.iter().map(|(a, w)| (*a, *w))
    }
}

/// A track in result order, with its composite score when weights were active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<'a> {
    pub track: &'a Track,
    pub score: Option<f64>,
}

fn matches(track: &Track, needle: &str) -> bool {
    track
        .searchable_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Tracks whose song, artist or album contains `term`, case-insensitively, in catalog order.
pub fn filter<'a>(tracks: &'a [Track], term: &str) -> Vec<&'a Track> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return tracks.iter().collect();
    }
    tracks.iter().filter(|t| matches(t, &needle)).collect()
}

/// Weighted sum of normalized attribute values.
pub fn composite_score(track: &Track, weights: &Weights, index: &NormalizationIndex) -> Result<f64, QueryError> {
    let mut score = 0.0;
    for (attribute, weight) in weights.iter() {
        score += f64::from(attribute.normalized(track, index)?) * weight;
    }
    Ok(score)
}

/// Filter then order: by descending composite score when any weight is active,
/// otherwise ascending by lower-cased song title. Ties keep catalog order.
pub fn rank<'a>(
    tracks: &'a [Track],
    index: &NormalizationIndex,
    search_term: &str,
    weights: &Weights,
) -> Result<Vec<Ranked<'a>>, QueryError> {
    for (attribute, _) in weights.iter() {
        index.ensure_scalable(attribute)?;
    }

    let filtered = filter(tracks, search_term);

    if weights.is_empty() {
        let mut ranked: Vec<Ranked<'a>> = filtered.into_iter().map(|track| Ranked { track, score: None }).collect();
        ranked.sort_by_cached_key(|r| r.track.song.to_lowercase());
        return Ok(ranked);
    }

    let mut scored = Vec::with_capacity(filtered.len());
    for track in filtered {
        scored.push((track, composite_score(track, weights, index)?));
    }
    // sort_by is stable, equal scores stay in catalog order
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    Ok(scored
        .into_iter()
        .map(|(track, score)| Ranked { track, score: Some(score) })
        .collect())
}
