//! Line mappers turn one line of text into named fields.

use std::fmt;

use csv::{ReaderBuilder, StringRecord};
use tailpath_core::Fields;
use tailpath_layout::GrokPattern;

use crate::error::FormatError;

/// Outcome of mapping a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapped {
    /// The line produced a row.
    Row(Fields),
    /// The line was consumed without producing a row, such as a header.
    Skipped,
    /// The line does not fit the format.
    Unmatched,
}

/// Parses lines into fields.
///
/// Mappers may keep state between lines (a delimited mapper remembers the
/// header), so each artifact gets its own instance.
pub trait LineMapper: Send + fmt::Debug {
    fn map_line(&mut self, line: &str) -> Result<Mapped, FormatError>;
}

/// Maps lines with a compiled grok or regular expression pattern.
#[derive(Debug, Clone)]
pub struct PatternMapper {
    pattern: GrokPattern,
}

impl PatternMapper {
    pub fn new(pattern: GrokPattern) -> Self {
        Self { pattern }
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &GrokPattern {
        &self.pattern
    }
}

impl LineMapper for PatternMapper {
    fn map_line(&mut self, line: &str) -> Result<Mapped, FormatError> {
        Ok(match self.pattern.match_fields(line) {
            Some(fields) => Mapped::Row(fields),
            None => Mapped::Unmatched,
        })
    }
}

/// Maps delimited (CSV-like) lines into columns.
///
/// Columns are named from the header line when `header` is set, and
/// `column0`, `column1`, ... otherwise.
#[derive(Debug, Clone)]
pub struct DelimitedMapper {
    delimiter: u8,
    quote: u8,
    escape: Option<u8>,
    header: bool,
    normalize_names: bool,
    null_str: Option<String>,
    null_padding: bool,
    columns: Option<Vec<String>>,
}

impl Default for DelimitedMapper {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: None,
            header: false,
            normalize_names: false,
            null_str: None,
            null_padding: false,
            columns: None,
        }
    }
}

impl DelimitedMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Escape character inside quoted values. An escape equal to the quote
    /// means doubled quotes.
    pub fn escape(mut self, escape: u8) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Treat the first line as column names.
    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Lowercase header names and replace anything but letters and digits
    /// with underscores.
    pub fn normalize_names(mut self, normalize: bool) -> Self {
        self.normalize_names = normalize;
        self
    }

    /// Values equal to this string are left out of the row.
    pub fn null_str(mut self, null_str: impl Into<String>) -> Self {
        self.null_str = Some(null_str.into());
        self
    }

    /// Accept lines with fewer columns than the header.
    pub fn null_padding(mut self, padding: bool) -> Self {
        self.null_padding = padding;
        self
    }

    /// Column names read from the header, once it has been seen.
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    fn split(&self, line: &str) -> Result<Option<StringRecord>, FormatError> {
        let escape = self.escape.filter(|e| *e != self.quote);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .escape(escape)
            .double_quote(escape.is_none())
            .from_reader(line.as_bytes());

        let mut record = StringRecord::new();
        Ok(reader.read_record(&mut record)?.then_some(record))
    }

    fn column_name(&self, name: &str) -> String {
        if !self.normalize_names {
            return name.to_string();
        }
        name.trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl LineMapper for DelimitedMapper {
    fn map_line(&mut self, line: &str) -> Result<Mapped, FormatError> {
        let Some(record) = self.split(line)? else {
            return Ok(Mapped::Skipped);
        };

        if self.header && self.columns.is_none() {
            let columns = record.iter().map(|name| self.column_name(name)).collect();
            self.columns = Some(columns);
            return Ok(Mapped::Skipped);
        }

        if let Some(columns) = &self.columns {
            if record.len() > columns.len() || (record.len() < columns.len() && !self.null_padding) {
                return Ok(Mapped::Unmatched);
            }
        }

        let mut fields = Fields::new();
        for (idx, value) in record.iter().enumerate() {
            if self.null_str.as_deref() == Some(value) {
                continue;
            }
            let name = match &self.columns {
                Some(columns) => columns[idx].clone(),
                None => format!("column{idx}"),
            };
            fields.insert(name, value.to_string());
        }
        Ok(Mapped::Row(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailpath_layout::GrokRegistry;

    #[test]
    fn test_pattern_mapper() {
        let pattern = GrokRegistry::new()
            .compile_anchored("%{WORD:level} %{GREEDYDATA:message}")
            .unwrap();
        let mut mapper = PatternMapper::new(pattern);

        let Mapped::Row(fields) = mapper.map_line("INFO server started").unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(fields["level"], "INFO");
        assert_eq!(fields["message"], "server started");
        assert_eq!(mapper.map_line("").unwrap(), Mapped::Unmatched);
    }

    #[test]
    fn test_delimited_without_header() {
        let mut mapper = DelimitedMapper::new();
        let Mapped::Row(fields) = mapper.map_line(r#"a,"b,c",d"#).unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(fields["column0"], "a");
        assert_eq!(fields["column1"], "b,c");
        assert_eq!(fields["column2"], "d");
    }

    #[test]
    fn test_delimited_header_names_columns() {
        let mut mapper = DelimitedMapper::new().header(true).delimiter(b'|');
        assert_eq!(mapper.map_line("host|status").unwrap(), Mapped::Skipped);
        assert_eq!(mapper.columns().unwrap(), ["host", "status"]);

        let Mapped::Row(fields) = mapper.map_line("web-1|200").unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(fields["host"], "web-1");
        assert_eq!(fields["status"], "200");
    }

    #[test]
    fn test_delimited_normalize_names() {
        let mut mapper = DelimitedMapper::new().header(true).normalize_names(true);
        mapper.map_line("Event Time,Source-IP").unwrap();
        assert_eq!(mapper.columns().unwrap(), ["event_time", "source_ip"]);
    }

    #[test]
    fn test_delimited_null_str_and_padding() {
        let mut strict = DelimitedMapper::new().header(true).null_str("NULL");
        strict.map_line("a,b,c").unwrap();
        assert_eq!(strict.map_line("1,2").unwrap(), Mapped::Unmatched);
        assert_eq!(strict.map_line("1,2,3,4").unwrap(), Mapped::Unmatched);

        let Mapped::Row(fields) = strict.map_line("1,NULL,3").unwrap() else {
            panic!("expected a row");
        };
        assert!(!fields.contains_key("b"));
        assert_eq!(fields["c"], "3");

        let mut padded = DelimitedMapper::new().header(true).null_padding(true);
        padded.map_line("a,b,c").unwrap();
        let Mapped::Row(fields) = padded.map_line("1").unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["a"], "1");
    }

    #[test]
    fn test_delimited_escape() {
        let mut mapper = DelimitedMapper::new().escape(b'\\');
        let Mapped::Row(fields) = mapper.map_line(r#""say \"hi\"",x"#).unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(fields["column0"], r#"say "hi""#);

        let mut doubled = DelimitedMapper::new().escape(b'"');
        let Mapped::Row(fields) = doubled.map_line(r#""say ""hi""",x"#).unwrap() else {
            panic!("expected a row");
        };
        assert_eq!(fields["column0"], r#"say "hi""#);
    }
}
