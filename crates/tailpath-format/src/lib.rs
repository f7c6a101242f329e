//! Line formats and the log table adapter for tailpath.
//!
//! A [`LineFormat`] describes how one line of an artifact becomes a set of
//! named fields. A [`LogTable`] binds a format to a table name, merges the
//! parsed fields over the fields captured from the artifact path, and adds
//! the common `tp_*` columns. [`ArtifactRows`] reads a downloaded artifact
//! through a table, one row per line.
//!
//! # Example
//!
//! ```no_run
//! use tailpath_format::{GrokFormat, LineFormat, LogTable};
//!
//! let table = LogTable::new("access_log", LineFormat::Grok(GrokFormat::new("%{COMMONAPACHELOG}")));
//! table.validate()?;
//! # Ok::<(), tailpath_format::FormatError>(())
//! ```

mod error;
mod format;
mod mapper;
mod registry;
mod rows;
mod table;

pub use error::FormatError;
pub use format::{CustomFormat, DelimitedFormat, FormatKind, GrokFormat, LineFormat, RegexFormat};
pub use mapper::{DelimitedMapper, LineMapper, Mapped, PatternMapper};
pub use registry::{FormatRef, FormatRegistry, TableConfig};
pub use rows::{ArtifactRows, open_artifact};
pub use table::{
    ARTIFACT_SOURCE_NAME, LogTable, Row, RowSourceOption, SourceMetadata, TP_INGEST_TIMESTAMP,
    TP_SOURCE_LOCATION, TP_SOURCE_NAME, TP_SOURCE_TYPE,
};
