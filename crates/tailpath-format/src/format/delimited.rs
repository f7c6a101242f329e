use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::mapper::DelimitedMapper;

/// Delimited (CSV-like) artifacts.
///
/// Every option is optional; only the options that are set are passed on
/// by [`DelimitedFormat::csv_options`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimitedFormat {
    /// Skip type detection and read every column as text.
    pub all_varchar: Option<bool>,
    /// Allow quoted values to be read as nulls.
    pub allow_quoted_nulls: Option<bool>,
    pub decimal_separator: Option<String>,
    /// Character separating columns.
    pub delimiter: Option<String>,
    /// Character preceding a quote inside a quoted value.
    pub escape: Option<String>,
    /// Add a column holding the file name.
    pub filename: Option<bool>,
    /// Columns never compared against the null string.
    pub force_not_null: Vec<String>,
    /// The first line holds column names.
    pub header: Option<bool>,
    /// Drop rows that fail to parse.
    pub ignore_errors: Option<bool>,
    pub max_line_size: Option<i64>,
    pub new_line: Option<String>,
    /// Strip non-alphanumeric characters from column names.
    pub normalize_names: Option<bool>,
    /// Pad short rows with nulls.
    pub null_padding: Option<bool>,
    pub null_str: Option<String>,
    pub quote: Option<String>,
    pub sample_size: Option<i64>,
    pub timestamp_format: Option<String>,
}

const NEW_LINES: &[&str] = &["\\r", "\\n", "\\r\\n", "\r", "\n", "\r\n"];

impl DelimitedFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options in `key=value` form, in a fixed order.
    ///
    /// Booleans and integers are written bare, strings single-quoted and
    /// `force_not_null` as an unquoted comma-separated list.
    pub fn csv_options(&self) -> Vec<String> {
        let mut opts = Vec::new();

        push_bool(&mut opts, "all_varchar", self.all_varchar);
        push_bool(&mut opts, "allow_quoted_nulls", self.allow_quoted_nulls);
        push_str(&mut opts, "decimal_separator", &self.decimal_separator);
        push_str(&mut opts, "delimiter", &self.delimiter);
        push_str(&mut opts, "escape", &self.escape);
        push_bool(&mut opts, "filename", self.filename);
        if !self.force_not_null.is_empty() {
            opts.push(format!("force_not_null={}", self.force_not_null.join(",")));
        }
        push_bool(&mut opts, "header", self.header);
        push_bool(&mut opts, "ignore_errors", self.ignore_errors);
        push_int(&mut opts, "max_line_size", self.max_line_size);
        push_str(&mut opts, "new_line", &self.new_line);
        push_bool(&mut opts, "normalize_names", self.normalize_names);
        push_bool(&mut opts, "null_padding", self.null_padding);
        push_str(&mut opts, "null_str", &self.null_str);
        push_str(&mut opts, "quote", &self.quote);
        push_int(&mut opts, "sample_size", self.sample_size);
        push_str(&mut opts, "timestamp_format", &self.timestamp_format);

        opts
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        for (key, value) in [
            ("delimiter", &self.delimiter),
            ("escape", &self.escape),
            ("quote", &self.quote),
        ] {
            single_byte(key, value.as_deref())?;
        }
        if let Some(new_line) = &self.new_line {
            if !NEW_LINES.contains(&new_line.as_str()) {
                return Err(FormatError::invalid(format!(
                    "new_line must be one of '\\r', '\\n' or '\\r\\n', got '{new_line}'"
                )));
            }
        }
        if self.max_line_size.is_some_and(|size| size <= 0) {
            return Err(FormatError::invalid("max_line_size must be positive"));
        }
        if self.sample_size.is_some_and(|size| size == 0 || size < -1) {
            return Err(FormatError::invalid("sample_size must be positive or -1"));
        }
        Ok(())
    }

    /// A local mapper honouring the delimiter, quoting, header and null
    /// options.
    pub fn mapper(&self) -> Result<DelimitedMapper, FormatError> {
        self.validate()?;

        let mut mapper = DelimitedMapper::new()
            .header(self.header.unwrap_or(false))
            .normalize_names(self.normalize_names.unwrap_or(false))
            .null_padding(self.null_padding.unwrap_or(false));
        if let Some(delimiter) = single_byte("delimiter", self.delimiter.as_deref())? {
            mapper = mapper.delimiter(delimiter);
        }
        if let Some(quote) = single_byte("quote", self.quote.as_deref())? {
            mapper = mapper.quote(quote);
        }
        if let Some(escape) = single_byte("escape", self.escape.as_deref())? {
            mapper = mapper.escape(escape);
        }
        if let Some(null_str) = &self.null_str {
            mapper = mapper.null_str(null_str.clone());
        }
        Ok(mapper)
    }
}

fn push_bool(opts: &mut Vec<String>, key: &str, value: Option<bool>) {
    if let Some(value) = value {
        opts.push(format!("{key}={value}"));
    }
}

fn push_int(opts: &mut Vec<String>, key: &str, value: Option<i64>) {
    if let Some(value) = value {
        opts.push(format!("{key}={value}"));
    }
}

fn push_str(opts: &mut Vec<String>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        opts.push(format!("{key}='{value}'"));
    }
}

fn single_byte(key: &str, value: Option<&str>) -> Result<Option<u8>, FormatError> {
    match value.map(str::as_bytes) {
        None => Ok(None),
        Some([byte]) => Ok(Some(*byte)),
        Some(_) => Err(FormatError::invalid(format!(
            "{key} must be a single ASCII character"
        ))),
    }
}
