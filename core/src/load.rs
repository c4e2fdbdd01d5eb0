use crate::catalog::Catalog;
use crate::track::Track;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Collect `*.json` and `*.jsonl` files under `input` (or `input` itself), in path order.
pub fn data_files(input: &Path) -> Vec<PathBuf> {
    files_with_extensions(input, &["json", "jsonl"])
}

/// Collect files under `input` whose extension is one of `extensions`, in path order.
/// A plain file path is returned as is, whatever its extension.
pub fn files_with_extensions(input: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            let wanted = p.extension().and_then(|s| s.to_str()).is_some_and(|ext| extensions.contains(&ext));
            if p.is_file() && wanted {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files.sort();
    files
}

/// Read every track in one data file. JSON files hold an array or a single object,
/// JSONL files one object per line.
pub fn read_tracks(file: &Path) -> Result<Vec<Track>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let mut tracks = Vec::new();
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let track: Track = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}: invalid track record", file.display(), n + 1))?;
            tracks.push(track);
        }
        return Ok(tracks);
    }

    let json: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| format!("{}: invalid JSON", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for (n, v) in arr.into_iter().enumerate() {
                let track: Track = serde_json::from_value(v)
                    .with_context(|| format!("{}: record {n}: invalid track record", file.display()))?;
                tracks.push(track);
            }
        }
        obj @ serde_json::Value::Object(_) => {
            tracks.push(serde_json::from_value(obj).with_context(|| format!("{}: invalid track record", file.display()))?);
        }
        _ => warn!(file = %file.display(), "ignoring data file that is neither an array nor an object"),
    }
    Ok(tracks)
}

/// Merge tracks by id. A repeated id replaces the earlier record but keeps its position.
pub fn merge_by_id(batches: impl IntoIterator<Item = Vec<Track>>) -> (Vec<Track>, usize) {
    let mut merged: Vec<Track> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut replaced = 0usize;
    for track in batches.into_iter().flatten() {
        match positions.get(&track.id) {
            Some(&pos) => {
                merged[pos] = track;
                replaced += 1;
            }
            None => {
                positions.insert(track.id.clone(), merged.len());
                merged.push(track);
            }
        }
    }
    (merged, replaced)
}

/// Build a catalog from every data file under `path`.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog> {
    let path = path.as_ref();
    let files = data_files(path);
    if files.is_empty() {
        warn!(path = %path.display(), "no catalog data files found");
    }

    let mut batches = Vec::with_capacity(files.len());
    for file in &files {
        batches.push(read_tracks(file)?);
    }
    let (tracks, replaced) = merge_by_id(batches);
    if replaced > 0 {
        info!(replaced, "records with repeated ids replaced earlier ones");
    }

    let catalog = Catalog::new(tracks)?;
    info!(
        files = files.len(),
        tracks = catalog.len(),
        max_tempo = catalog.normalization().max_tempo(),
        max_duration_seconds = catalog.normalization().max_duration_seconds(),
        "catalog loaded"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const FIRST: &str = r#"[
        {"spotify_track_id": "a", "song": "One", "artist": "X", "album": "Y", "time": "3:00", "tempo": 100,
         "popularity": 10, "dance": 1, "energy": 1, "acoustic": 1, "instrumental": 1, "happy": 1, "speech": 1, "live": 1},
        {"spotify_track_id": "b", "song": "Two", "artist": "X", "album": "Y", "time": "4:00", "tempo": 120,
         "popularity": 20, "dance": 1, "energy": 1, "acoustic": 1, "instrumental": 1, "happy": 1, "speech": 1, "live": 1}
    ]"#;

    const SECOND: &str = concat!(
        r#"{"id": "c", "song": "Three", "artist": "Z", "album": "W", "duration": "1:00", "tempo": 90, "popularity": 30, "danceability": 1, "energy": 1, "acousticness": 1, "instrumentalness": 1, "happiness": 1, "speechiness": 1, "liveness": 1}"#,
        "\n\n",
        r#"{"id": "a", "song": "One (Remaster)", "artist": "X", "album": "Y", "duration": "3:10", "tempo": 100, "popularity": 11, "danceability": 1, "energy": 1, "acousticness": 1, "instrumentalness": 1, "happiness": 1, "speechiness": 1, "liveness": 1}"#,
        "\n"
    );

    #[test]
    fn loads_and_merges_files_in_path_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1-first.json"), FIRST).unwrap();
        fs::write(dir.path().join("2-second.jsonl"), SECOND).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = load_catalog(dir.path()).unwrap();
        let ids: Vec<_> = catalog.tracks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(catalog.tracks()[0].song, "One (Remaster)");
        assert_eq!(catalog.normalization().max_tempo(), 120);
        assert_eq!(catalog.normalization().max_duration_seconds(), 240);
    }

    #[test]
    fn collects_only_requested_extensions() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        for name in ["b.json", "a.csv", "nested/c.jsonl", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let names = |files: Vec<PathBuf>| -> Vec<String> {
            files.iter().map(|f| f.strip_prefix(dir.path()).unwrap().display().to_string()).collect()
        };
        assert_eq!(names(data_files(dir.path())), vec!["b.json", "nested/c.jsonl"]);
        assert_eq!(
            names(files_with_extensions(dir.path(), &["json", "jsonl", "csv"])),
            vec!["a.csv", "b.json", "nested/c.jsonl"]
        );
    }

    #[test]
    fn malformed_duration_fails_the_load() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), FIRST.replace("\"4:00\"", "\"four minutes\"")).unwrap();
        let err = load_catalog(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("malformed duration"));
    }

    #[test]
    fn empty_dir_loads_empty_catalog() {
        let dir = tempdir().unwrap();
        let catalog = load_catalog(dir.path()).unwrap();
        assert!(catalog.is_empty());
    }
}
