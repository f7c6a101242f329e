//! Binding a line format to a named log table.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tailpath_core::{Fields, SourceEnrichment};

use crate::error::FormatError;
use crate::format::LineFormat;
use crate::mapper::LineMapper;

/// Name of the row source that reads artifacts from any artifact source.
pub const ARTIFACT_SOURCE_NAME: &str = "artifact";

pub const TP_SOURCE_TYPE: &str = "tp_source_type";
pub const TP_SOURCE_LOCATION: &str = "tp_source_location";
pub const TP_SOURCE_NAME: &str = "tp_source_name";
pub const TP_INGEST_TIMESTAMP: &str = "tp_ingest_timestamp";

/// One output row: named string columns in insertion order.
pub type Row = Fields;

/// Options a table requests from its row source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSourceOption {
    /// Every line of an artifact is a separate row.
    RowPerLine,
}

/// What a table needs from a row source.
#[derive(Debug)]
pub struct SourceMetadata {
    pub source_name: &'static str,
    pub mapper: Box<dyn LineMapper>,
    pub options: Vec<RowSourceOption>,
}

/// A log table: a name plus the format its lines are written in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTable {
    pub name: String,
    pub format: LineFormat,
}

impl LogTable {
    pub fn new(name: impl Into<String>, format: impl Into<LineFormat>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.name
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.name.trim().is_empty() {
            return Err(FormatError::invalid("custom table name is required"));
        }
        self.format.validate().map_err(|err| match err {
            FormatError::Invalid { message } => FormatError::invalid(format!(
                "invalid format for table '{}': {message}",
                self.name
            )),
            other => other,
        })
    }

    /// The row source this table reads from, with a fresh mapper.
    pub fn source_metadata(&self) -> Result<Vec<SourceMetadata>, FormatError> {
        let mapper = self.format.mapper().map_err(|err| {
            FormatError::invalid(format!(
                "error creating '{}' mapper for custom table '{}': {err}",
                self.format.identifier(),
                self.name
            ))
        })?;

        Ok(vec![SourceMetadata {
            source_name: ARTIFACT_SOURCE_NAME,
            mapper,
            options: vec![RowSourceOption::RowPerLine],
        }])
    }

    /// Build a row from line fields and the artifact's enrichment.
    ///
    /// Path-derived fields come first, line fields overwrite them on
    /// collision, and the `tp_*` columns are always set last.
    pub fn enrich_row(
        &self,
        line_fields: Fields,
        enrichment: &SourceEnrichment,
        ingested_at: DateTime<Utc>,
    ) -> Row {
        let mut row = enrichment.fields.clone();
        row.extend(line_fields);
        row.insert(TP_SOURCE_TYPE.to_string(), enrichment.source_type.clone());
        row.insert(
            TP_SOURCE_LOCATION.to_string(),
            enrichment.source_location.clone(),
        );
        row.insert(TP_SOURCE_NAME.to_string(), self.name.clone());
        row.insert(
            TP_INGEST_TIMESTAMP.to_string(),
            ingested_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        row
    }
}
