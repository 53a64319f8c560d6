//! JSON operation records accepted by the `batch` command.

use std::fmt;
use std::io::Read;

use serde::Deserialize;
use thermobatch_core::Operation;

/// Identifier of an input record: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric identifier, kept in its JSON form.
    Number(serde_json::Number),
    /// Textual identifier.
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => fmt::Display::fmt(number, f),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// One PCR reaction as stored in the input file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationRecord {
    /// Caller-supplied identifier echoed in the output.
    pub id: RecordId,
    /// Extension time, clustered into devices.
    pub extension_time: f64,
    /// Annealing temperature, clustered into rows.
    pub anneal_temp: f64,
}

impl From<OperationRecord> for Operation<RecordId> {
    fn from(record: OperationRecord) -> Self {
        Self::new(record.id, record.extension_time, record.anneal_temp)
    }
}

/// Parses a JSON array of [`OperationRecord`] values.
///
/// # Errors
/// Returns [`serde_json::Error`] when the input is not a JSON array of
/// records.
///
/// # Examples
/// ```
/// use thermobatch_cli::cli::{RecordId, read_operations};
///
/// let json = r#"[{"id": "pcr-1", "extension_time": 60, "anneal_temp": 69.5}]"#;
/// let operations = read_operations(json.as_bytes()).expect("valid records");
/// assert_eq!(operations[0].id(), &RecordId::Text("pcr-1".into()));
/// assert_eq!(operations[0].secondary_value(), 69.5);
/// ```
pub fn read_operations(reader: impl Read) -> Result<Vec<Operation<RecordId>>, serde_json::Error> {
    let records: Vec<OperationRecord> = serde_json::from_reader(reader)?;
    Ok(records.into_iter().map(Operation::from).collect())
}
