//! Grok pattern registry and compiler.
//!
//! Grok text is regular-expression text with `%{NAME}` and
//! `%{NAME:field}` tokens. Each token is replaced by the named pattern's
//! definition; tokens carrying a field name become capture groups whose
//! matches are reported under that field.

use indexmap::IndexMap;
use regex::Regex;
use tailpath_core::Fields;

use crate::error::LayoutError;

/// Capture-group prefix used for grok fields, so field names never clash
/// with the regex crate's group-name rules.
const FIELD_GROUP_PREFIX: &str = "__tp";

/// The built-in pattern set.
pub const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("USERNAME", r"[a-zA-Z0-9._-]+"),
    ("USER", r"%{USERNAME}"),
    ("EMAILLOCALPART", r"[a-zA-Z][a-zA-Z0-9_.+=:-]+"),
    ("EMAILADDRESS", r"%{EMAILLOCALPART}@%{HOSTNAME}"),
    ("INT", r"[+-]?[0-9]+"),
    ("BASE10NUM", r"[+-]?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)"),
    ("NUMBER", r"%{BASE10NUM}"),
    ("BASE16NUM", r"[+-]?(?:0x)?[0-9A-Fa-f]+"),
    ("POSINT", r"\b[1-9][0-9]*\b"),
    ("NONNEGINT", r"\b[0-9]+\b"),
    ("WORD", r"\b\w+\b"),
    ("NOTSPACE", r"\S+"),
    ("SPACE", r"\s*"),
    ("DATA", r".*?"),
    ("GREEDYDATA", r".*"),
    (
        "QUOTEDSTRING",
        r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`"#,
    ),
    ("QS", r"%{QUOTEDSTRING}"),
    ("UUID", r"[A-Fa-f0-9]{8}-(?:[A-Fa-f0-9]{4}-){3}[A-Fa-f0-9]{12}"),
    (
        "IPV4",
        r"(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])",
    ),
    (
        "IPV6",
        r"(?:[0-9A-Fa-f]{1,4}:){7}[0-9A-Fa-f]{1,4}|(?:[0-9A-Fa-f]{1,4}:){1,6}(?::[0-9A-Fa-f]{1,4}){1,6}|(?:[0-9A-Fa-f]{1,4}:){1,7}:|:(?::[0-9A-Fa-f]{1,4}){1,7}|::",
    ),
    ("IP", r"%{IPV6}|%{IPV4}"),
    (
        "HOSTNAME",
        r"\b[0-9A-Za-z][0-9A-Za-z-]{0,62}(?:\.[0-9A-Za-z][0-9A-Za-z-]{0,62})*\b",
    ),
    ("IPORHOST", r"%{IP}|%{HOSTNAME}"),
    ("HOSTPORT", r"%{IPORHOST}:%{POSINT}"),
    ("UNIXPATH", r"(?:/[\w%!$@:.,+~-]*)+"),
    ("WINPATH", r"(?:[A-Za-z]+:|\\)(?:\\[^\\?*]*)+"),
    ("PATH", r"%{UNIXPATH}|%{WINPATH}"),
    ("URIPROTO", r"[A-Za-z][A-Za-z0-9+.-]*"),
    ("URIHOST", r"%{IPORHOST}(?::%{POSINT})?"),
    ("URIPATH", r"(?:/[A-Za-z0-9$.+!*'(){},~:;=@#%&_-]*)+"),
    ("URIPARAM", r"\?[A-Za-z0-9$.+!*'|(){},~@#%&/=:;_?\[\]<>-]*"),
    ("URIPATHPARAM", r"%{URIPATH}(?:%{URIPARAM})?"),
    (
        "URI",
        r"%{URIPROTO}://(?:%{USER}(?::[^@]*)?@)?(?:%{URIHOST})?(?:%{URIPATHPARAM})?",
    ),
    (
        "MONTH",
        r"\b(?:[Jj]an(?:uary)?|[Ff]eb(?:ruary)?|[Mm]ar(?:ch)?|[Aa]pr(?:il)?|[Mm]ay|[Jj]un(?:e)?|[Jj]ul(?:y)?|[Aa]ug(?:ust)?|[Ss]ep(?:tember)?|[Oo]ct(?:ober)?|[Nn]ov(?:ember)?|[Dd]ec(?:ember)?)\b",
    ),
    ("MONTHNUM", r"0?[1-9]|1[0-2]"),
    ("MONTHNUM2", r"0[1-9]|1[0-2]"),
    ("MONTHDAY", r"0[1-9]|[12][0-9]|3[01]|[1-9]"),
    (
        "DAY",
        r"\b(?:Mon(?:day)?|Tue(?:sday)?|Wed(?:nesday)?|Thu(?:rsday)?|Fri(?:day)?|Sat(?:urday)?|Sun(?:day)?)\b",
    ),
    ("YEAR", r"(?:\d\d){1,2}"),
    ("HOUR", r"2[0123]|[01]?[0-9]"),
    ("MINUTE", r"[0-5][0-9]"),
    ("SECOND", r"(?:[0-5]?[0-9]|60)(?:[:.,][0-9]+)?"),
    ("TIME", r"%{HOUR}:%{MINUTE}(?::%{SECOND})?"),
    ("DATE_US", r"%{MONTHNUM}[/-]%{MONTHDAY}[/-]%{YEAR}"),
    ("DATE_EU", r"%{MONTHDAY}[./-]%{MONTHNUM}[./-]%{YEAR}"),
    ("ISO8601_TIMEZONE", r"Z|[+-]%{HOUR}(?::?%{MINUTE})?"),
    (
        "TIMESTAMP_ISO8601",
        r"%{YEAR}-%{MONTHNUM}-%{MONTHDAY}[T ]%{HOUR}:?%{MINUTE}(?::?%{SECOND})?(?:%{ISO8601_TIMEZONE})?",
    ),
    ("DATE", r"%{DATE_US}|%{DATE_EU}"),
    ("DATESTAMP", r"%{DATE}[- ]%{TIME}"),
    ("TZ", r"[A-Z]{3}"),
    ("HTTPDATE", r"%{MONTHDAY}/%{MONTH}/%{YEAR}:%{TIME} %{INT}"),
    ("SYSLOGTIMESTAMP", r"%{MONTH} +%{MONTHDAY} %{TIME}"),
    ("PROG", r"[\x21-\x5a\x5c\x5e-\x7e]+"),
    ("SYSLOGPROG", r"%{PROG:program}(?:\[%{POSINT:pid}\])?"),
    ("SYSLOGHOST", r"%{IPORHOST}"),
    (
        "LOGLEVEL",
        r"[Aa]lert|ALERT|[Tt]race|TRACE|[Dd]ebug|DEBUG|[Nn]otice|NOTICE|[Ii]nfo(?:rmation)?|INFO(?:RMATION)?|[Ww]arn(?:ing)?|WARN(?:ING)?|[Ee]rr(?:or)?|ERR(?:OR)?|[Cc]rit(?:ical)?|CRIT(?:ICAL)?|[Ff]atal|FATAL|[Ss]evere|SEVERE|EMERG(?:ENCY)?|[Ee]merg(?:ency)?",
    ),
    ("HTTPDUSER", r"%{EMAILADDRESS}|%{USER}"),
    (
        "COMMONAPACHELOG",
        r#"%{IPORHOST:clientip} %{HTTPDUSER:ident} %{USER:auth} \[%{HTTPDATE:timestamp}\] "(?:%{WORD:verb} %{NOTSPACE:request}(?: HTTP/%{NUMBER:httpversion})?|%{DATA:rawrequest})" %{NUMBER:response} (?:%{NUMBER:bytes}|-)"#,
    ),
    (
        "COMBINEDAPACHELOG",
        r"%{COMMONAPACHELOG} %{QS:referrer} %{QS:agent}",
    ),
];

/// Check that a pattern name is made of ASCII letters, digits and underscores.
pub fn is_valid_pattern_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Named grok sub-patterns.
///
/// Custom patterns override built-in ones of the same name and may refer
/// to any other registered pattern.
#[derive(Debug, Clone)]
pub struct GrokRegistry {
    patterns: IndexMap<String, String>,
}

impl Default for GrokRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GrokRegistry {
    /// Create a registry holding [`DEFAULT_PATTERNS`].
    pub fn new() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS
                .iter()
                .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
                .collect(),
        }
    }

    /// Create a registry with no patterns at all.
    pub fn empty() -> Self {
        Self {
            patterns: IndexMap::new(),
        }
    }

    /// Register one pattern.
    pub fn add_pattern(
        &mut self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<(), LayoutError> {
        self.add_patterns([(name, pattern)])
    }

    /// Register a batch of patterns, then check that each one compiles.
    ///
    /// Patterns in the batch may refer to each other regardless of order.
    pub fn add_patterns<I, K, V>(&mut self, patterns: I) -> Result<(), LayoutError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut added = Vec::new();
        for (name, pattern) in patterns {
            let name = name.into();
            if !is_valid_pattern_name(&name) {
                return Err(LayoutError::invalid(
                    &name,
                    "pattern names may only contain ASCII letters, digits and underscores",
                ));
            }
            self.patterns.insert(name.clone(), pattern.into());
            added.push(name);
        }

        for name in &added {
            let definition = &self.patterns[name.as_str()];
            self.compile(definition).map_err(|err| match err {
                LayoutError::Regex { source, .. } => LayoutError::Regex {
                    pattern: name.clone(),
                    source,
                },
                other => other,
            })?;
            tracing::debug!(name = %name, "registered grok pattern");
        }

        Ok(())
    }

    /// Definition of a registered pattern.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.patterns.get(name).map(String::as_str)
    }

    /// Check if a pattern is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// Number of registered patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Expand grok text into the regular expression it stands for.
    pub fn to_regex(&self, text: &str) -> Result<String, LayoutError> {
        let mut out = String::new();
        self.expand_into(text, text, &mut out, &mut Vec::new(), &mut Vec::new())?;
        Ok(out)
    }

    /// Compile grok text for unanchored matching.
    pub fn compile(&self, text: &str) -> Result<GrokPattern, LayoutError> {
        let mut out = String::new();
        let mut fields = Vec::new();
        self.expand_into(text, text, &mut out, &mut fields, &mut Vec::new())?;
        GrokPattern::new(text, &out, fields)
    }

    /// Compile grok text so it must match the whole input.
    pub fn compile_anchored(&self, text: &str) -> Result<GrokPattern, LayoutError> {
        let mut out = String::from("^(?:");
        let mut fields = Vec::new();
        self.expand_into(text, text, &mut out, &mut fields, &mut Vec::new())?;
        out.push_str(")$");
        GrokPattern::new(text, &out, fields)
    }

    fn expand_into(
        &self,
        text: &str,
        root: &str,
        out: &mut String,
        fields: &mut Vec<String>,
        stack: &mut Vec<String>,
    ) -> Result<(), LayoutError> {
        let mut rest = text;
        while let Some(start) = find_token(rest) {
            out.push_str(&rest[..start]);
            let body = &rest[start + 2..];
            let end = body
                .find('}')
                .ok_or_else(|| LayoutError::invalid(root, "unterminated grok token"))?;
            let token = &body[..end];
            rest = &body[end + 1..];

            // %{NAME}, %{NAME:field} or %{NAME:field:type}; the type is ignored.
            let mut parts = token.splitn(3, ':');
            let name = parts.next().unwrap_or_default();
            let field = parts.next().filter(|f| !f.is_empty());

            let definition =
                self.patterns
                    .get(name)
                    .ok_or_else(|| LayoutError::UnknownPattern {
                        name: name.to_string(),
                        pattern: root.to_string(),
                    })?;
            if stack.iter().any(|s| s == name) {
                return Err(LayoutError::RecursivePattern {
                    name: name.to_string(),
                });
            }

            match field {
                Some(field) => {
                    out.push_str(&format!("(?P<{FIELD_GROUP_PREFIX}{}>", fields.len()));
                    fields.push(field.to_string());
                }
                None => out.push_str("(?:"),
            }
            stack.push(name.to_string());
            self.expand_into(definition, root, out, fields, stack)?;
            stack.pop();
            out.push(')');
        }
        out.push_str(rest);
        Ok(())
    }
}

/// Byte offset of the next unescaped `%{`.
fn find_token(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut idx = 0;
    while idx + 1 < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b'%' if bytes[idx + 1] == b'{' => return Some(idx),
            _ => idx += 1,
        }
    }
    None
}

/// A compiled grok or plain regular expression.
#[derive(Debug, Clone)]
pub struct GrokPattern {
    source: String,
    regex: Regex,
    fields: Vec<(usize, String)>,
}

impl GrokPattern {
    fn new(source: &str, expanded: &str, grok_fields: Vec<String>) -> Result<Self, LayoutError> {
        let regex = Regex::new(expanded).map_err(|err| LayoutError::Regex {
            pattern: source.to_string(),
            source: err,
        })?;

        let fields = regex
            .capture_names()
            .enumerate()
            .filter_map(|(idx, name)| {
                let name = name?;
                let field = match name
                    .strip_prefix(FIELD_GROUP_PREFIX)
                    .and_then(|n| n.parse::<usize>().ok())
                {
                    Some(n) => grok_fields.get(n)?.clone(),
                    None => name.to_string(),
                };
                Some((idx, field))
            })
            .collect();

        Ok(Self {
            source: source.to_string(),
            regex,
            fields,
        })
    }

    /// Compile a plain regular expression; named groups become fields.
    pub fn from_regex(pattern: &str) -> Result<Self, LayoutError> {
        Self::new(pattern, pattern, Vec::new())
    }

    /// The text this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The expanded regular expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Check if the pattern matches.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Match `text` and collect every participating field.
    ///
    /// When several groups share a field name the last one that matched
    /// wins. Returns `None` when the pattern does not match.
    pub fn match_fields(&self, text: &str) -> Option<Fields> {
        let captures = self.regex.captures(text)?;
        let mut fields = Fields::new();
        for (idx, name) in &self.fields {
            if let Some(m) = captures.get(*idx) {
                fields.insert(name.clone(), m.as_str().to_string());
            }
        }
        Some(fields)
    }

    /// Distinct field names in group order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.fields.len());
        for (_, name) in &self.fields {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_compile() {
        let registry = GrokRegistry::new();
        for (name, _) in DEFAULT_PATTERNS {
            assert!(
                registry.compile(&format!("%{{{name}}}")).is_ok(),
                "{name} failed to compile"
            );
        }
    }

    #[test]
    fn test_field_token_becomes_capture() {
        let registry = GrokRegistry::new();
        assert_eq!(registry.to_regex("%{WORD:org}").unwrap(), r"(?P<__tp0>\b\w+\b)");
        assert_eq!(registry.to_regex("a%{WORD}b").unwrap(), r"a(?:\b\w+\b)b");
    }

    #[test]
    fn test_escaped_token_is_literal() {
        let registry = GrokRegistry::new();
        assert_eq!(registry.to_regex(r"\%{WORD}").unwrap(), r"\%{WORD}");
    }

    #[test]
    fn test_match_fields() {
        let registry = GrokRegistry::new();
        let pattern = registry
            .compile("%{LOGLEVEL:level} %{GREEDYDATA:message}")
            .unwrap();
        let fields = pattern.match_fields("ERROR disk is full").unwrap();
        assert_eq!(fields["level"], "ERROR");
        assert_eq!(fields["message"], "disk is full");
        assert!(pattern.match_fields("").is_none());
    }

    #[test]
    fn test_type_suffix_is_ignored() {
        let registry = GrokRegistry::new();
        let pattern = registry.compile("took %{INT:ms:int}ms").unwrap();
        assert_eq!(pattern.match_fields("took 42ms").unwrap()["ms"], "42");
    }

    #[test]
    fn test_anchored_vs_unanchored() {
        let registry = GrokRegistry::new();
        assert!(registry.compile("%{INT}").unwrap().is_match("abc 12 def"));
        assert!(!registry.compile_anchored("%{INT}").unwrap().is_match("abc 12 def"));
        assert!(registry.compile_anchored("%{INT}").unwrap().is_match("12"));
    }

    #[test]
    fn test_duplicate_field_last_writer_wins() {
        let registry = GrokRegistry::new();
        let pattern = registry.compile("%{WORD:name}-%{WORD:name}").unwrap();
        let fields = pattern.match_fields("first-second").unwrap();
        assert_eq!(fields["name"], "second");
        assert_eq!(pattern.field_names(), vec!["name"]);
    }

    #[test]
    fn test_regex_named_groups_pass_through() {
        let registry = GrokRegistry::new();
        let pattern = registry
            .compile(r"(?P<level>[A-Z]+) %{GREEDYDATA:msg}")
            .unwrap();
        let fields = pattern.match_fields("WARN low memory").unwrap();
        assert_eq!(fields["level"], "WARN");
        assert_eq!(fields["msg"], "low memory");
    }

    #[test]
    fn test_custom_patterns() {
        let mut registry = GrokRegistry::new();
        registry
            .add_patterns([("ACCOUNT", "[0-9]{12}"), ("ARN", "arn:aws:%{WORD}::%{ACCOUNT:account}")])
            .unwrap();
        let fields = registry
            .compile("%{ARN}")
            .unwrap()
            .match_fields("arn:aws:iam::123456789012")
            .unwrap();
        assert_eq!(fields["account"], "123456789012");
    }

    #[test]
    fn test_custom_pattern_overrides_default() {
        let mut registry = GrokRegistry::new();
        registry.add_pattern("WORD", "[a-z]+").unwrap();
        assert_eq!(registry.get("WORD"), Some("[a-z]+"));
        assert!(!registry.compile_anchored("%{WORD}").unwrap().is_match("ABC"));
    }

    #[test]
    fn test_malformed_custom_pattern() {
        let mut registry = GrokRegistry::new();
        let err = registry.add_pattern("BROKEN", "[a-").unwrap_err();
        match err {
            LayoutError::Regex { pattern, .. } => assert_eq!(pattern, "BROKEN"),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(registry.add_pattern("bad name", "x").is_err());
    }

    #[test]
    fn test_unknown_and_recursive_patterns() {
        let registry = GrokRegistry::new();
        assert!(matches!(
            registry.compile("%{NOPE:x}"),
            Err(LayoutError::UnknownPattern { .. })
        ));

        let mut registry = GrokRegistry::empty();
        let err = registry.add_patterns([("A", "%{B}"), ("B", "x%{A}")]).unwrap_err();
        assert!(matches!(err, LayoutError::RecursivePattern { .. }));
    }

    #[test]
    fn test_from_regex() {
        let pattern = GrokPattern::from_regex(r"^(?P<host>\S+) (?P<code>\d{3})$").unwrap();
        assert_eq!(pattern.field_names(), vec!["host", "code"]);
        let fields = pattern.match_fields("web01 404").unwrap();
        assert_eq!(fields["host"], "web01");
        assert_eq!(fields["code"], "404");
        assert!(GrokPattern::from_regex("(unclosed").is_err());
    }
}
