//! Dataset loading from JSON / CSV files, optionally gzipped.

use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{CodeStore, MemoryStore, StateMap};
use crate::models::PostalRecord;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON dataset {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid CSV dataset {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("invalid dataset {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

/// Detect the dataset format from the file name, looking through a `.gz`
/// suffix. Returns the format and whether the file is compressed.
fn detect_format(path: &Path) -> Option<(Format, bool)> {
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    let (name, gzipped) = match name.strip_suffix(".gz") {
        Some(inner) => (inner.to_string(), true),
        None => (name, false),
    };

    if name.ends_with(".json") {
        Some((Format::Json, gzipped))
    } else if name.ends_with(".csv") {
        Some((Format::Csv, gzipped))
    } else {
        None
    }
}

/// CSV row layout: `zip,latitude,longitude,city,state[,country]`
#[derive(Debug, Deserialize)]
struct CsvRow {
    zip: String,
    latitude: f64,
    longitude: f64,
    city: String,
    state: String,
    #[serde(default)]
    country: Option<String>,
}

impl From<CsvRow> for PostalRecord {
    fn from(row: CsvRow) -> Self {
        let record = PostalRecord::new(row.zip, row.latitude, row.longitude, row.city, row.state);
        match row.country {
            Some(country) if !country.is_empty() => record.with_country(country),
            _ => record,
        }
    }
}

/// Load a dataset file, or every recognised dataset file under a directory.
pub fn load_path(path: &Path) -> Result<MemoryStore, LoadError> {
    if path.is_dir() {
        return load_dir(path);
    }

    let (format, gzipped) =
        detect_format(path).ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;

    info!("Loading postal codes from {}", path.display());

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let reader = BufReader::new(reader);

    let store = match format {
        Format::Json => parse_json(reader, path)?,
        Format::Csv => parse_csv(reader, path)?,
    };

    info!("Loaded {} postal codes from {}", store.len(), path.display());
    Ok(store)
}

/// Load several sources and merge them in order; later sources win on
/// duplicate codes.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<MemoryStore, LoadError> {
    let mut store = MemoryStore::new();
    for path in paths {
        store.merge(load_path(path.as_ref())?);
    }
    Ok(store)
}

fn load_dir(dir: &Path) -> Result<MemoryStore, LoadError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|source| LoadError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        if detect_format(path).is_none() {
            debug!("Skipping non-dataset file {}", path.display());
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    info!("Found {} dataset files in {}", files.len(), dir.display());

    load_paths(&files)
}

/// Accepts either `{"codes": {...}, "stateMap": {...}}` or a bare
/// `{code: record}` object.
fn parse_json<R: Read>(reader: R, path: &Path) -> Result<MemoryStore, LoadError> {
    let json_err = |source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    };
    let malformed = |reason: &str| LoadError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let value: Value = serde_json::from_reader(reader).map_err(json_err)?;
    let Value::Object(mut root) = value else {
        return Err(malformed("top level must be an object"));
    };

    let state_map = match root.remove("stateMap") {
        Some(v) => {
            let map: HashMap<String, Vec<String>> = serde_json::from_value(v).map_err(json_err)?;
            Some(map.into_iter().collect::<StateMap>())
        }
        None => None,
    };

    let codes = match root.remove("codes") {
        Some(Value::Object(codes)) => codes,
        Some(_) => return Err(malformed("\"codes\" must be an object")),
        None => root,
    };

    let mut entries = Vec::with_capacity(codes.len());
    for (code, v) in codes {
        let mut record: PostalRecord = serde_json::from_value(v).map_err(json_err)?;
        if record.zip.is_empty() {
            record.zip = code.clone();
        }
        entries.push((code, record));
    }

    let store = MemoryStore::from_keyed(entries);
    Ok(match state_map {
        Some(map) => store.with_state_map(map),
        None => store,
    })
}

fn parse_csv<R: Read>(reader: R, path: &Path) -> Result<MemoryStore, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<CsvRow>() {
        let row = row.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(PostalRecord::from(row));
    }

    Ok(MemoryStore::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const WRAPPED_JSON: &str = r#"{
        "codes": {
            "37167": {"zip": "37167", "latitude": 35.9582, "longitude": -86.5186, "city": "Smyrna", "state": "TN", "country": "US"},
            "37086": {"zip": "37086", "latitude": 36.0087, "longitude": -86.5589, "city": "La Vergne", "state": "TN", "country": "US"}
        },
        "stateMap": {"TN": ["37167", "37086"]}
    }"#;

    const CSV: &str = "zip,latitude,longitude,city,state,country\n\
        M5V,43.6426,-79.3871,Toronto,ON,CA\n\
        H2X,45.5117,-73.5673,Montreal,QC,\n";

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("codes.json")), Some((Format::Json, false)));
        assert_eq!(detect_format(Path::new("codes.CSV.gz")), Some((Format::Csv, true)));
        assert_eq!(detect_format(Path::new("codes.js")), None);
        assert_eq!(detect_format(Path::new("README")), None);
    }

    #[test]
    fn test_load_wrapped_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.json");
        std::fs::write(&path, WRAPPED_JSON).unwrap();

        let store = load_path(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("37086").unwrap().city, "La Vergne");
        assert_eq!(store.codes_in_state("TN").len(), 2);
    }

    #[test]
    fn test_load_bare_json_fills_zip_from_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.json");
        std::fs::write(
            &path,
            r#"{"37167": {"latitude": 35.9582, "longitude": -86.5186, "city": "Smyrna", "state": "TN"}}"#,
        )
        .unwrap();

        let store = load_path(&path).unwrap();
        assert_eq!(store.lookup("37167").unwrap().zip, "37167");
        assert_eq!(store.codes_in_state("TN"), ["37167"]);
    }

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canada.csv");
        std::fs::write(&path, CSV).unwrap();

        let store = load_path(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("M5V").unwrap().country.as_deref(), Some("CA"));
        assert_eq!(store.lookup("H2X").unwrap().country, None);
    }

    #[test]
    fn test_load_gzipped_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.json.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(WRAPPED_JSON.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let store = load_path(&path).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_load_dir_merges_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_us.json"), WRAPPED_JSON).unwrap();
        std::fs::create_dir(dir.path().join("canada")).unwrap();
        std::fs::write(dir.path().join("canada").join("codes.csv"), CSV).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = load_path(dir.path()).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(store.codes_in_state("QC"), ["H2X"]);
        assert_eq!(store.codes_in_state("TN").len(), 2);
    }

    #[test]
    fn test_errors() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("codes.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(load_path(&path), Err(LoadError::UnsupportedFormat(_))));

        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(load_path(&path), Err(LoadError::Malformed { .. })));

        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "zip,latitude,longitude,city,state\n1,north,2,X,Y\n").unwrap();
        assert!(matches!(load_path(&path), Err(LoadError::Csv { .. })));

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_path(&missing), Err(LoadError::Io { .. })));
    }
}
