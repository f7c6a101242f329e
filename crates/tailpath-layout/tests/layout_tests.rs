use indexmap::IndexMap;
use tailpath_core::SourceError;
use tailpath_layout::{CompiledSet, GrokRegistry, LayoutError, expand};

const CLOUDTRAIL_PATHS: &[&str] = &[
    "AWSLogs/org1/1/CloudTrail/1_1.log",
    "AWSLogs/org2/6/CloudTrail/6_3.log",
    "AWSLogs/3/CloudTrail/3_2.log",
];

#[test]
fn test_expansion_bounds() {
    for (layout, groups) in [
        ("AWSLogs/%{WORD:account_id}/%{DATA}", 0u32),
        ("AWSLogs/(%{WORD:org}/)?%{WORD:account_id}/%{DATA}", 1),
        ("AWSLogs/(%{WORD:org}/)?(%{WORD:region}/)?%{WORD:account_id}/%{DATA}", 2),
        ("(a/)?(b/)?(c/)?d", 3),
    ] {
        let alternatives = expand(layout).unwrap();
        assert!(!alternatives.is_empty());
        assert!(alternatives.len() <= 2usize.pow(groups), "{layout}");
    }
}

#[test]
fn test_optional_org_layout_matches_both_trees() {
    let set = CompiledSet::from_layout(
        "AWSLogs/(%{WORD:org}/)?%{WORD:account_id}/CloudTrail/%{NOTSPACE:file_name}.%{WORD:ext}",
        &IndexMap::new(),
    )
    .unwrap();
    assert_eq!(set.len(), 2);

    for path in CLOUDTRAIL_PATHS {
        let result = set.match_full(path);
        assert!(result.matched, "{path}");
        assert_eq!(result.fields["ext"], "log");
    }

    let result = set.match_full("AWSLogs/3/CloudTrail/3_2.log");
    assert_eq!(result.fields["account_id"], "3");
    assert_eq!(result.fields["file_name"], "3_2");
    assert!(result.fields.get("org").is_none());
}

#[test]
fn test_longer_layout_matches_nothing() {
    let set = CompiledSet::from_layout(
        "AWSLogs/%{WORD:org}/%{WORD:account_id}/CloudTrail/%{WORD:region}/%{DATA}.log",
        &IndexMap::new(),
    )
    .unwrap();
    for path in CLOUDTRAIL_PATHS {
        assert!(!set.match_full(path).matched, "{path}");
    }
    assert!(set.match_prefix("AWSLogs/org1/1/CloudTrail", 4).matched);
}

#[test]
fn test_literal_org_prunes_other_orgs() {
    let set = CompiledSet::from_layout(
        "AWSLogs/org1/%{WORD:account_id}/CloudTrail/%{DATA}.log",
        &IndexMap::new(),
    )
    .unwrap();
    assert!(set.match_prefix("AWSLogs/org1", 2).matched);
    assert!(!set.match_prefix("AWSLogs/org2", 2).matched);
}

#[test]
fn test_common_apache_log() {
    let registry = GrokRegistry::new();
    let pattern = registry.compile("%{COMMONAPACHELOG}").unwrap();
    let fields = pattern
        .match_fields(r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#)
        .unwrap();

    assert_eq!(fields["clientip"], "127.0.0.1");
    assert_eq!(fields["ident"], "-");
    assert_eq!(fields["auth"], "frank");
    assert_eq!(fields["timestamp"], "10/Oct/2000:13:55:36 -0700");
    assert_eq!(fields["verb"], "GET");
    assert_eq!(fields["request"], "/apache_pb.gif");
    assert_eq!(fields["httpversion"], "1.0");
    assert_eq!(fields["response"], "200");
    assert_eq!(fields["bytes"], "2326");
    assert!(!fields.contains_key("rawrequest"));
}

#[test]
fn test_combined_apache_log() {
    let registry = GrokRegistry::new();
    let pattern = registry.compile("%{COMBINEDAPACHELOG}").unwrap();
    let fields = pattern
        .match_fields(r#"10.1.2.3 - - [01/Jan/2024:00:00:01 +0000] "POST /api HTTP/1.1" 201 - "https://example.com/" "curl/8.0""#)
        .unwrap();

    assert_eq!(fields["clientip"], "10.1.2.3");
    assert_eq!(fields["verb"], "POST");
    assert_eq!(fields["response"], "201");
    assert!(!fields.contains_key("bytes"));
    assert_eq!(fields["referrer"], r#""https://example.com/""#);
    assert_eq!(fields["agent"], r#""curl/8.0""#);
}

#[test]
fn test_errors_map_to_fatal_source_errors() {
    let err: SourceError = expand("AWSLogs/(%{WORD:org}/").unwrap_err().into();
    assert!(matches!(err, SourceError::InvalidPattern { .. }));

    let err = CompiledSet::from_layout("AWSLogs/%{MISSING:x}", &IndexMap::new()).unwrap_err();
    assert!(matches!(err, LayoutError::UnknownPattern { .. }));
    let err: SourceError = err.into();
    assert!(matches!(err, SourceError::PatternCompile { .. }));
    assert!(err.is_fatal());
}
