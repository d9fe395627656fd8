//! Corpus loading
//!
//! Reads a corpus table from a JSON array (`.json`) or JSON Lines
//! (`.jsonl` / `.ndjson`) file. Malformed rows are counted and skipped; the
//! run aborts only when the skip ratio exceeds the configured threshold or
//! when a required column is absent from the whole table.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

use super::record::CorpusRecord;
use crate::error::{CribaError, Result, SchemaError};
use crate::features::FeatureVector;

/// Columns every row must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "category", "has_rust", "error_codes"];

/// Column holding pre-extracted feature flags.
pub const FEATURE_COLUMN: &str = "feature_flags";

/// Fallback column features are derived from when flags are absent.
pub const SOURCE_COLUMN: &str = "python_code";

/// Maximum number of individual skip warnings logged per load.
const MAX_LOGGED_SKIPS: usize = 10;

/// On-disk table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    /// A single JSON array of row objects
    Json,
    /// One JSON object per line
    JsonLines,
}

impl CorpusFormat {
    /// Pick the format from the file extension, `None` if unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("jsonl") | Some("ndjson") => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Loader settings.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Fraction of rows that may be skipped before the load fails
    pub max_skip_ratio: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_skip_ratio: 0.20,
        }
    }
}

/// Row accounting for a completed load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStats {
    pub total_rows: usize,
    pub loaded: usize,
    pub skipped: usize,
    /// Skip reason → count
    pub skip_reasons: BTreeMap<String, usize>,
}

impl LoadStats {
    pub fn skip_ratio(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.skipped as f64 / self.total_rows as f64
        }
    }
}

/// A loaded corpus snapshot.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub records: Vec<CorpusRecord>,
    pub stats: LoadStats,
}

impl Corpus {
    /// Wrap already-built records (tests, benches, in-memory pipelines).
    pub fn from_records(records: Vec<CorpusRecord>) -> Self {
        let stats = LoadStats {
            total_rows: records.len(),
            loaded: records.len(),
            ..LoadStats::default()
        };
        Self { records, stats }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Row shape accepted on input. Extra columns (e.g. labels from a previous
/// `label` run) are ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    id: String,
    category: String,
    has_rust: bool,
    #[serde(default)]
    compiles: Option<bool>,
    #[serde(default)]
    tests_pass: Option<bool>,
    error_codes: Option<Vec<String>>,
    #[serde(default)]
    feature_flags: Option<FeatureVector>,
    #[serde(default)]
    python_code: Option<String>,
}

/// Why a single row was rejected.
#[derive(Debug, Clone, PartialEq)]
enum RowError {
    NotObject,
    MissingColumn(&'static str),
    Invalid(String),
    DuplicateId(String),
}

impl RowError {
    fn reason(&self) -> String {
        match self {
            Self::NotObject => "not an object".to_string(),
            Self::MissingColumn(c) => format!("missing column '{}'", c),
            Self::Invalid(_) => "invalid value".to_string(),
            Self::DuplicateId(_) => "duplicate id".to_string(),
        }
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(detail) => write!(f, "invalid value: {}", detail),
            Self::DuplicateId(id) => write!(f, "duplicate id '{}'", id),
            other => write!(f, "{}", other.reason()),
        }
    }
}

/// Tracks which required columns appear anywhere in the table.
#[derive(Debug, Default)]
struct ColumnPresence {
    seen: HashSet<&'static str>,
    objects: usize,
}

impl ColumnPresence {
    fn observe(&mut self, row: &serde_json::Map<String, Value>) {
        self.objects += 1;
        for column in REQUIRED_COLUMNS
            .iter()
            .chain([FEATURE_COLUMN, SOURCE_COLUMN].iter())
        {
            if row.contains_key(*column) {
                self.seen.insert(*column);
            }
        }
    }

    /// First required column that no row carried.
    fn first_absent(&self) -> Option<&'static str> {
        if self.objects == 0 {
            return None;
        }
        if let Some(col) = REQUIRED_COLUMNS.iter().find(|c| !self.seen.contains(**c)) {
            return Some(*col);
        }
        if !self.seen.contains(FEATURE_COLUMN) && !self.seen.contains(SOURCE_COLUMN) {
            return Some(FEATURE_COLUMN);
        }
        None
    }
}

/// Incremental row validator shared by both formats.
struct RowCollector {
    options: LoadOptions,
    records: Vec<CorpusRecord>,
    ids: HashSet<String>,
    presence: ColumnPresence,
    stats: LoadStats,
}

impl RowCollector {
    fn new(options: LoadOptions) -> Self {
        Self {
            options,
            records: Vec::new(),
            ids: HashSet::new(),
            presence: ColumnPresence::default(),
            stats: LoadStats::default(),
        }
    }

    fn push(&mut self, row_number: usize, value: Option<Value>) {
        self.stats.total_rows += 1;
        let result = match value {
            Some(v) => self.convert(v),
            None => Err(RowError::Invalid("unparseable JSON".to_string())),
        };
        match result {
            Ok(record) => {
                self.stats.loaded += 1;
                self.records.push(record);
            }
            Err(err) => {
                self.stats.skipped += 1;
                *self.stats.skip_reasons.entry(err.reason()).or_insert(0) += 1;
                if self.stats.skipped <= MAX_LOGGED_SKIPS {
                    warn!("Skipping row {}: {}", row_number, err);
                }
            }
        }
    }

    fn convert(&mut self, value: Value) -> std::result::Result<CorpusRecord, RowError> {
        let Value::Object(map) = value else {
            return Err(RowError::NotObject);
        };
        self.presence.observe(&map);

        if let Some(column) = REQUIRED_COLUMNS.iter().find(|c| !map.contains_key(**c)) {
            return Err(RowError::MissingColumn(*column));
        }
        if !map.contains_key(FEATURE_COLUMN) && !map.contains_key(SOURCE_COLUMN) {
            return Err(RowError::MissingColumn(FEATURE_COLUMN));
        }

        let raw: RawRow = serde_json::from_value(Value::Object(map))
            .map_err(|e| RowError::Invalid(e.to_string()))?;

        if !self.ids.insert(raw.id.clone()) {
            return Err(RowError::DuplicateId(raw.id));
        }

        let features = match (raw.feature_flags, raw.python_code) {
            (Some(flags), _) => flags,
            (None, Some(code)) => FeatureVector::from_source(&code),
            (None, None) => FeatureVector::default(),
        };

        Ok(CorpusRecord {
            id: raw.id,
            category: raw.category,
            has_rust: raw.has_rust,
            compiles: raw.compiles,
            tests_pass: raw.tests_pass,
            error_codes: raw.error_codes.unwrap_or_default(),
            features,
        })
    }

    fn finish(self) -> Result<Corpus> {
        if let Some(column) = self.presence.first_absent() {
            return Err(SchemaError::MissingColumn(column.to_string()).into());
        }

        let ratio = self.stats.skip_ratio();
        if ratio > self.options.max_skip_ratio {
            return Err(SchemaError::SkipRatioExceeded {
                skipped: self.stats.skipped,
                total: self.stats.total_rows,
                ratio: ratio * 100.0,
                threshold: self.options.max_skip_ratio * 100.0,
            }
            .into());
        }

        if self.stats.skipped > 0 {
            warn!(
                "Skipped {} of {} rows: {:?}",
                self.stats.skipped, self.stats.total_rows, self.stats.skip_reasons
            );
        }
        info!(
            "Loaded {} records ({} rows read)",
            self.stats.loaded, self.stats.total_rows
        );

        Ok(Corpus {
            records: self.records,
            stats: self.stats,
        })
    }
}

/// Load a corpus file, choosing the format from its extension or content.
pub fn load_corpus(path: &Path, options: LoadOptions) -> Result<Corpus> {
    let file = File::open(path).map_err(|e| CribaError::input(path, e))?;
    let mut reader = BufReader::new(file);

    let format = match CorpusFormat::from_path(path) {
        Some(format) => format,
        None => sniff_format(&mut reader).map_err(|e| CribaError::input(path, e))?,
    };
    debug!("Reading {} as {:?}", path.display(), format);

    match format {
        CorpusFormat::Json => read_json_array(reader, options)
            .map_err(|e| attach_path(e, path)),
        CorpusFormat::JsonLines => read_json_lines(reader, options)
            .map_err(|e| attach_path(e, path)),
    }
}

/// Read a JSON array table from any reader.
pub fn read_json_array<R: Read>(reader: R, options: LoadOptions) -> Result<Corpus> {
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| CribaError::input("<stream>", e))?;
    let Value::Array(rows) = value else {
        return Err(SchemaError::NotTabular("top-level value is not an array".into()).into());
    };

    let mut collector = RowCollector::new(options);
    for (i, row) in rows.into_iter().enumerate() {
        collector.push(i + 1, Some(row));
    }
    collector.finish()
}

/// Read a JSON Lines table from any buffered reader. Blank lines are ignored.
/// A line that is not valid UTF-8 JSON counts as a malformed row; only I/O
/// failures abort the read.
pub fn read_json_lines<R: BufRead>(reader: R, options: LoadOptions) -> Result<Corpus> {
    let mut collector = RowCollector::new(options);
    for (i, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|e| CribaError::input("<stream>", e))?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        collector.push(i + 1, serde_json::from_slice(&line).ok());
    }
    collector.finish()
}

/// Peek at the first non-whitespace byte: `[` means a JSON array.
fn sniff_format<R: BufRead>(reader: &mut R) -> std::io::Result<CorpusFormat> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(CorpusFormat::JsonLines);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(pos) => {
                let format = if buf[pos] == b'[' {
                    CorpusFormat::Json
                } else {
                    CorpusFormat::JsonLines
                };
                return Ok(format);
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Replace the placeholder stream path with the real file path.
fn attach_path(err: CribaError, path: &Path) -> CribaError {
    match err {
        CribaError::Input { source, .. } => CribaError::input(path, source),
        other => other,
    }
}
