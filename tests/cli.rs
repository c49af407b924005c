mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestWorkspace;
use import_mapper::column::{DataType, TimeUnit};
use predicates::{prelude::PredicateBooleanExt, str::contains};
use serde_json::json;

const PEOPLE_CSV: &str = "\
id,name,joined
1,Alice,2019-01-30
2,Bob,2020-02-15
";

fn probe(workspace: &TestWorkspace, input: &str, mapping: &str) {
    cargo_bin_cmd!("import-mapper")
        .args([
            "probe",
            "-i",
            workspace.file(input).to_str().unwrap(),
            "-o",
            workspace.file(mapping).to_str().unwrap(),
        ])
        .assert()
        .success();
}

#[test]
fn probe_writes_mapping_for_csv_input() {
    let workspace = TestWorkspace::new();
    workspace.write("people.csv", PEOPLE_CSV);
    probe(&workspace, "people.csv", "people-mapping.yml");

    let mapping = workspace.load_mapping("people-mapping.yml");
    assert_eq!(mapping.locale.as_deref(), Some("en-US"));
    let types = mapping
        .columns
        .iter()
        .map(|pair| (pair.name(), pair.data_type()))
        .collect::<Vec<_>>();
    assert_eq!(
        types,
        [
            ("id", DataType::Number),
            ("name", DataType::Text),
            ("joined", DataType::Time),
        ]
    );
    let joined = &mapping.columns[2];
    assert_eq!(joined.source.format.as_deref(), Some("yyyy-MM-dd"));
    assert_eq!(joined.target.grouping_time_unit, Some(TimeUnit::Day));
}

#[test]
fn probe_prints_yaml_to_stdout_without_output_path() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    cargo_bin_cmd!("import-mapper")
        .args(["probe", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("dataType: TIME").and(contains("format: yyyy-MM-dd")));
}

#[test]
fn columns_lists_mapping_as_table() {
    let workspace = TestWorkspace::new();
    workspace.write("people.csv", PEOPLE_CSV);
    probe(&workspace, "people.csv", "people-mapping.yml");

    cargo_bin_cmd!("import-mapper")
        .args([
            "columns",
            "-m",
            workspace.file("people-mapping.yml").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(
            contains("source")
                .and(contains("joined"))
                .and(contains("yyyy-MM-dd -> d MMM yyyy")),
        );
}

#[test]
fn map_converts_rows_to_json_lines() {
    let workspace = TestWorkspace::new();
    workspace.write("people.csv", PEOPLE_CSV);
    probe(&workspace, "people.csv", "people-mapping.yml");

    cargo_bin_cmd!("import-mapper")
        .args([
            "map",
            "-i",
            workspace.file("people.csv").to_str().unwrap(),
            "-m",
            workspace.file("people-mapping.yml").to_str().unwrap(),
            "-o",
            workspace.file("people.jsonl").to_str().unwrap(),
        ])
        .assert()
        .success();

    let records = workspace.read_json_lines("people.jsonl");
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0],
        json!({
            "id": "1000001",
            "entry": {
                "_id": "1000001",
                "id": 1.0,
                "name": "Alice",
                "joined": "2019-01-30T00:00:00Z",
            },
            "errors": [],
        })
    );
    assert_eq!(records[1]["id"], json!("1000002"));
}

#[test]
fn map_reports_conversion_errors_and_filters_with_errors_only() {
    let workspace = TestWorkspace::new();
    workspace.write("people.csv", PEOPLE_CSV);
    probe(&workspace, "people.csv", "people-mapping.yml");
    let dirty = workspace.write(
        "dirty.csv",
        "id,name,joined\n1,Alice,2019-01-30\nabc,Bob,2020-02-15\n3,Carol,someday\n",
    );

    cargo_bin_cmd!("import-mapper")
        .args([
            "map",
            "-i",
            dirty.to_str().unwrap(),
            "-m",
            workspace.file("people-mapping.yml").to_str().unwrap(),
            "-o",
            workspace.file("errors.jsonl").to_str().unwrap(),
            "--errors-only",
            "--id-start",
            "10",
        ])
        .assert()
        .success();

    let records = workspace.read_json_lines("errors.jsonl");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], json!("1000012"));
    assert_eq!(records[0]["entry"]["name"], json!("Bob"));
    assert_eq!(
        records[0]["errors"],
        json!(["Column 'id': Cannot convert \"abc\" to Number"])
    );
    assert!(records[1].get("entry").is_none());
    assert_eq!(
        records[1]["errors"],
        json!(["Column 'joined': Cannot convert \"someday\" to Time using format \"yyyy-MM-dd\""])
    );
}

#[test]
fn probe_and_map_json_lines_input() {
    let workspace = TestWorkspace::new();
    workspace.write(
        "events.jsonl",
        "{\"name\":\"open\",\"createdTime\":1700000000000,\"ok\":true}\n\
         {\"name\":\"close\",\"createdTime\":1700000100000,\"ok\":false}\n",
    );
    probe(&workspace, "events.jsonl", "events-mapping.yml");
    let mapping = workspace.load_mapping("events-mapping.yml");
    let type_of = |name: &str| {
        mapping
            .column_index(name)
            .map(|idx| mapping.columns[idx].data_type())
    };
    assert_eq!(type_of("createdTime"), Some(DataType::Time));
    assert_eq!(type_of("ok"), Some(DataType::Boolean));
    assert_eq!(type_of("name"), Some(DataType::Text));

    cargo_bin_cmd!("import-mapper")
        .args([
            "map",
            "-i",
            workspace.file("events.jsonl").to_str().unwrap(),
            "-m",
            workspace.file("events-mapping.yml").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(
            contains("\"createdTime\":\"2023-11-14T22:13:20Z\"")
                .and(contains("\"ok\":false")),
        );
}

#[test]
fn map_fails_for_missing_mapping_file() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    cargo_bin_cmd!("import-mapper")
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            workspace.file("missing.yml").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("Opening mapping file"));
}

#[test]
fn map_rejects_id_start_beyond_sequence_range() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("people.csv", PEOPLE_CSV);
    probe(&workspace, "people.csv", "people-mapping.yml");
    cargo_bin_cmd!("import-mapper")
        .args([
            "map",
            "-i",
            input.to_str().unwrap(),
            "-m",
            workspace.file("people-mapping.yml").to_str().unwrap(),
            "--id-start",
            &(u64::MAX - 1).to_string(),
        ])
        .assert()
        .failure()
        .stderr(contains("Id sequence start"));
}
