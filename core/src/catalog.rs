use crate::error::CatalogError;
use crate::normalize::NormalizationIndex;
use crate::track::Track;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

/// Immutable, insertion-ordered set of tracks plus its normalization index.
#[derive(Debug, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
    normalization: NormalizationIndex,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(tracks.len());
        for track in &tracks {
            if !seen.insert(track.id.as_str()) {
                return Err(CatalogError::DuplicateId(track.id.clone()));
            }
        }
        let normalization = NormalizationIndex::from_tracks(&tracks);
        Ok(Self { tracks, normalization })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn normalization(&self) -> &NormalizationIndex {
        &self.normalization
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Handle to the live catalog. Readers take a snapshot and never hold the lock while querying;
/// a reload builds a fresh `Catalog` and swaps it in.
#[derive(Debug, Default)]
pub struct SharedCatalog {
    current: RwLock<Arc<Catalog>>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self { current: RwLock::new(Arc::new(catalog)) }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current.read().clone()
    }

    /// Swap in a new catalog, returning the one it replaced.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        std::mem::replace(&mut *self.current.write(), next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackRecord;

    fn track(id: &str, tempo: u32) -> Track {
        Track::try_from(TrackRecord { id: id.into(), tempo, ..Default::default() }).unwrap()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::new(vec![track("a", 1), track("b", 2), track("a", 3)]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId("a".into()));
    }

    #[test]
    fn snapshot_survives_replace() {
        let shared = SharedCatalog::new(Catalog::new(vec![track("a", 100)]).unwrap());
        let before = shared.snapshot();
        let old = shared.replace(Catalog::new(vec![track("b", 50), track("c", 200)]).unwrap());

        assert!(Arc::ptr_eq(&before, &old));
        assert_eq!(before.len(), 1);
        assert_eq!(before.normalization().max_tempo(), 100);

        let after = shared.snapshot();
        assert_eq!(after.len(), 2);
        assert_eq!(after.normalization().max_tempo(), 200);
    }
}
