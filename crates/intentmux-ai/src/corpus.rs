//! Training corpus: labelled example queries with their canonical responses.
//!
//! Read from the delimited dataset the training pipeline consumed. Only the
//! query, intent and response columns are used; other columns are ignored.
//! Records missing any of the three are dropped, queries are normalised and
//! intents trimmed so runtime lookups compare like with like.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use intentmux_core::normalize;
use intentmux_core::text::{is_blank, normalize_label};
use serde::Serialize;
use tracing::info;

use crate::ArtifactError;

pub const QUERY_COLUMN: &str = "User_Query";
pub const INTENT_COLUMN: &str = "Intent";
pub const RESPONSE_COLUMN: &str = "Ideal_Response";

/// One cleaned training example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusRecord {
    /// Normalised (lowercased, trimmed) user query.
    pub query: String,
    /// Trimmed intent label.
    pub intent: String,
    /// Canonical response, as written in the dataset.
    pub response: String,
}

/// Cleaned corpus. Record order is preserved from the source file; the
/// lexical index relies on row `i` of the index matching record `i` here.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<CorpusRecord>,
    dropped: usize,
}

impl Corpus {
    /// Read and clean a CSV corpus from disk.
    pub fn from_path(path: &Path) -> Result<Self, ArtifactError> {
        let file = File::open(path).map_err(|e| ArtifactError::io(path, e))?;
        let corpus = Self::from_reader(file)?;
        info!(
            records = corpus.len(),
            dropped = corpus.dropped,
            path = %path.display(),
            "loaded training corpus"
        );
        Ok(corpus)
    }

    /// Read and clean a CSV corpus with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ArtifactError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
                .ok_or(ArtifactError::MissingColumn(name))
        };
        let query_idx = column(QUERY_COLUMN)?;
        let intent_idx = column(INTENT_COLUMN)?;
        let response_idx = column(RESPONSE_COLUMN)?;

        let mut raw = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            raw.push((
                record.get(query_idx).map(str::to_string),
                record.get(intent_idx).map(str::to_string),
                record.get(response_idx).map(str::to_string),
            ));
        }

        Ok(Self::from_raw(raw))
    }

    /// Clean raw `(query, intent, response)` rows, dropping incomplete ones.
    pub fn from_raw<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (Option<String>, Option<String>, Option<String>)>,
    {
        let mut records = Vec::new();
        let mut dropped = 0usize;

        for row in rows {
            match row {
                (Some(query), Some(intent), Some(response))
                    if !is_blank(&query) && !is_blank(&intent) && !is_blank(&response) =>
                {
                    records.push(CorpusRecord {
                        query: normalize(&query),
                        intent: normalize_label(&intent),
                        response,
                    });
                }
                _ => dropped += 1,
            }
        }

        Self { records, dropped }
    }

    pub fn records(&self) -> &[CorpusRecord] {
        &self.records
    }

    pub fn get(&self, row: usize) -> Option<&CorpusRecord> {
        self.records.get(row)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of source rows dropped for missing fields.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Normalised queries in record order.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.query.as_str())
    }

    /// Occurrences of each intent label, keyed in sorted order.
    pub fn intent_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.intent.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
ID,Intent,User_Query,System_Instruction,Ideal_Response,Source
1,AccountReset,Reset my password,be nice,Use the reset link.,gen
2, AccountReset ,  I FORGOT my password  ,be nice,Use the reset link.,gen
3,Location,,be nice,We are in Lahore.,gen
4,Location,where is your office,be nice,,gen
5,,hello,be nice,Hi!,gen
6,Greeting,\"hello, there\",be nice,\"Hi, how can I help?\",gen
";

    #[test]
    fn reads_and_cleans() {
        let corpus = Corpus::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.dropped(), 3);

        let first = corpus.get(0).unwrap();
        assert_eq!(first.query, "reset my password");
        assert_eq!(first.intent, "AccountReset");
        assert_eq!(first.response, "Use the reset link.");

        let second = corpus.get(1).unwrap();
        assert_eq!(second.query, "i forgot my password");
        assert_eq!(second.intent, "AccountReset");
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let corpus = Corpus::from_reader(CSV.as_bytes()).unwrap();
        let greeting = corpus.get(2).unwrap();
        assert_eq!(greeting.query, "hello, there");
        assert_eq!(greeting.response, "Hi, how can I help?");
    }

    #[test]
    fn preserves_source_order() {
        let corpus = Corpus::from_reader(CSV.as_bytes()).unwrap();
        let intents: Vec<&str> = corpus.records().iter().map(|r| r.intent.as_str()).collect();
        assert_eq!(intents, vec!["AccountReset", "AccountReset", "Greeting"]);
    }

    #[test]
    fn intent_counts_sorted() {
        let corpus = Corpus::from_reader(CSV.as_bytes()).unwrap();
        let counts: Vec<(&str, usize)> = corpus.intent_counts().into_iter().collect();
        assert_eq!(counts, vec![("AccountReset", 2), ("Greeting", 1)]);
    }

    #[test]
    fn missing_column_errors() {
        let err = Corpus::from_reader("Intent,User_Query\nA,b\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingColumn(RESPONSE_COLUMN)));
    }

    #[test]
    fn short_rows_are_dropped() {
        let data = "User_Query,Intent,Ideal_Response\nhello,Greeting\nhi,Greeting,Hello!\n";
        let corpus = Corpus::from_reader(data.as_bytes()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.dropped(), 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Corpus::from_path(Path::new("/nonexistent/corpus.csv")).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }
}
