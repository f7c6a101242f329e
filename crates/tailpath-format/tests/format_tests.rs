use std::fs;
use std::path::Path;
use std::sync::Arc;

use tailpath_core::{EventLog, FileSourceConfig};
use tailpath_format::{ArtifactRows, FormatError, FormatRegistry, LineFormat, LogTable, TableConfig};
use tailpath_scan::FileSource;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const ACCESS_LINES: &str = concat!(
    r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "-" "curl/8.0""#,
    "\n",
    "not an access line\n",
    r#"10.0.0.9 - - [10/Oct/2000:13:55:37 -0700] "POST /login HTTP/1.1" 302 - "https://example.com/" "Mozilla/5.0""#,
    "\n",
);

fn create_test_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("web/eu-west-1")).unwrap();
    fs::create_dir_all(root.join("db/eu-west-1")).unwrap();
    fs::write(root.join("web/eu-west-1/access.log"), ACCESS_LINES).unwrap();
    fs::write(root.join("db/eu-west-1/slow.log"), "ignored").unwrap();
    temp
}

fn discover(root: &Path, layout: &str) -> Vec<tailpath_core::DownloadedArtifactInfo> {
    let mut source = FileSource::new(FileSourceConfig::new([root]).with_layout(layout)).unwrap();
    let log = Arc::new(EventLog::new());
    source.add_observer(log.clone());
    source.discover_artifacts(&CancellationToken::new()).unwrap();
    log.artifacts()
        .iter()
        .map(|info| source.download_artifact(info).unwrap())
        .collect()
}

#[test]
fn test_rows_merge_path_and_line_fields() {
    let temp = create_test_tree();
    let artifacts = discover(temp.path(), "web/%{NOTSPACE:region}/%{WORD:name}.log");
    assert_eq!(artifacts.len(), 1);

    let registry = FormatRegistry::with_defaults();
    let table: TableConfig = toml::from_str(
        r#"
        name = "access_log"
        format = "apache_combined"
        "#,
    )
    .unwrap();
    let table = table.build(&registry).unwrap();

    let results: Vec<_> = ArtifactRows::open(&table, &artifacts[0]).unwrap().collect();
    assert_eq!(results.len(), 3);
    assert!(matches!(results[1], Err(FormatError::LineMismatch { line: 2, .. })));

    let rows: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
    assert_eq!(rows.len(), 2);

    let first = &rows[0];
    assert_eq!(first["region"], "eu-west-1");
    assert_eq!(first["name"], "access");
    assert_eq!(first["clientip"], "127.0.0.1");
    assert_eq!(first["response"], "200");
    assert_eq!(first["tp_source_type"], "file");
    assert_eq!(first["tp_source_name"], "access_log");
    assert!(first["tp_source_location"].ends_with("access.log"));

    assert_eq!(rows[1]["verb"], "POST");
    assert!(!rows[1].contains_key("bytes"));
}

#[test]
fn test_line_fields_win_over_path_fields() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("svc-a")).unwrap();
    fs::write(temp.path().join("svc-a/events.csv"), "service,status\nsvc-b,ok\n").unwrap();

    let artifacts = discover(temp.path(), "%{NOTSPACE:service}/events.csv");
    let table: LogTable = toml::from_str(
        r#"
        name = "events"

        [format]
        type = "delimited"
        header = true
        "#,
    )
    .unwrap();
    table.validate().unwrap();

    let rows: Vec<_> = ArtifactRows::open(&table, &artifacts[0])
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["service"], "svc-b");
    assert_eq!(rows[0]["status"], "ok");
}

#[test]
fn test_inline_format_config() {
    let config: TableConfig = toml::from_str(
        r#"
        name = "app"

        [format]
        type = "regex"
        layout = '^(?P<level>[A-Z]+) (?P<message>.*)$'
        "#,
    )
    .unwrap();
    let table = config.build(&FormatRegistry::new()).unwrap();
    assert!(matches!(table.format, LineFormat::Regex(_)));
}

#[test]
fn test_table_config_errors() {
    let registry = FormatRegistry::with_defaults();

    let missing_name: TableConfig = toml::from_str(r#"format = "syslog""#).unwrap();
    assert_eq!(
        missing_name.build(&registry).unwrap_err().to_string(),
        "custom table name is required"
    );

    let missing_format: TableConfig = toml::from_str(r#"name = "t""#).unwrap();
    assert_eq!(
        missing_format.build(&registry).unwrap_err().to_string(),
        "source format is required"
    );
}
