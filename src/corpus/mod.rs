//! Corpus table loading and record types
//!
//! A corpus is a table of Python→Rust transpilation attempts. Rows are
//! validated once at load time; everything downstream works on immutable
//! [`CorpusRecord`]s.

mod loader;
mod record;

pub use loader::{
    load_corpus, read_json_array, read_json_lines, Corpus, CorpusFormat, LoadOptions, LoadStats,
    FEATURE_COLUMN, REQUIRED_COLUMNS, SOURCE_COLUMN,
};
pub use record::{CorpusRecord, Outcome};
