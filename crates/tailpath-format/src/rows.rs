//! Reading a downloaded artifact through a log table.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::MultiGzDecoder;
use tailpath_core::{DownloadedArtifactInfo, SourceEnrichment};

use crate::error::FormatError;
use crate::mapper::{LineMapper, Mapped};
use crate::table::{LogTable, Row};

/// Open an artifact for line reading, decompressing `.gz` files.
pub fn open_artifact(path: &Path) -> Result<Box<dyn BufRead + Send>, FormatError> {
    let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));

    Ok(if gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// Rows of one artifact, one per non-blank line.
///
/// A line the format does not match yields [`FormatError::LineMismatch`]
/// and reading continues with the next line. A read failure ends the
/// iteration after it is reported.
pub struct ArtifactRows<'a> {
    table: &'a LogTable,
    mapper: Box<dyn LineMapper>,
    lines: Lines<Box<dyn BufRead + Send>>,
    enrichment: SourceEnrichment,
    path: PathBuf,
    line: u64,
    ingested_at: DateTime<Utc>,
    done: bool,
}

impl<'a> ArtifactRows<'a> {
    pub fn open(table: &'a LogTable, artifact: &DownloadedArtifactInfo) -> Result<Self, FormatError> {
        let mapper = table
            .source_metadata()?
            .into_iter()
            .next()
            .map(|metadata| metadata.mapper)
            .ok_or_else(|| FormatError::invalid("table has no row source"))?;
        let reader = open_artifact(&artifact.local_path)?;

        tracing::debug!(
            table = %table.name,
            artifact = %artifact.local_path.display(),
            "reading artifact rows"
        );

        Ok(Self {
            table,
            mapper,
            lines: reader.lines(),
            enrichment: artifact.info.source_enrichment.clone(),
            path: artifact.local_path.clone(),
            line: 0,
            ingested_at: Utc::now(),
            done: false,
        })
    }

    /// Number of lines read so far.
    pub fn line_number(&self) -> u64 {
        self.line
    }
}

impl Iterator for ArtifactRows<'_> {
    type Item = Result<Row, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    self.done = true;
                    return Some(Err(FormatError::io(&self.path, err)));
                }
            };
            self.line += 1;

            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line.trim().is_empty() {
                continue;
            }

            return Some(match self.mapper.map_line(line) {
                Ok(Mapped::Row(fields)) => {
                    Ok(self.table.enrich_row(fields, &self.enrichment, self.ingested_at))
                }
                Ok(Mapped::Skipped) => continue,
                Ok(Mapped::Unmatched) => Err(FormatError::LineMismatch {
                    path: self.path.clone(),
                    line: self.line,
                    format: self.table.format.identifier(),
                }),
                Err(err) => Err(err),
            });
        }
    }
}
