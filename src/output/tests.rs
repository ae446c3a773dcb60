//! Output tests

use super::*;
use crate::types::{LoadMode, Row};
use arrow::datatypes::DataType;
use serde_json::{json, Value};

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

#[test]
fn test_schema_follows_column_order() {
    let rows = vec![row(json!({"b": 1, "a": "x"}))];
    let schema = build_schema(&columns(&["a", "b"]), &rows);

    let names: Vec<_> = schema.fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(schema.fields().iter().all(|f| f.is_nullable()));
}

#[test]
fn test_schema_type_inference_and_merging() {
    let rows = vec![
        row(json!({"int": 1, "float": 1.5, "bool": true, "text": "x", "mixed": 1})),
        row(json!({"int": 2, "float": 2, "bool": false, "text": "y", "mixed": "two"})),
    ];
    let schema = build_schema(
        &columns(&["int", "float", "bool", "text", "mixed", "absent"]),
        &rows,
    );

    assert_eq!(schema.field(0).data_type(), &DataType::Int64);
    // Int widens to Float when mixed with floats
    assert_eq!(schema.field(1).data_type(), &DataType::Float64);
    assert_eq!(schema.field(2).data_type(), &DataType::Boolean);
    assert_eq!(schema.field(3).data_type(), &DataType::Utf8);
    // Incompatible types fall back to Utf8
    assert_eq!(schema.field(4).data_type(), &DataType::Utf8);
    // A column never carrying a value is Utf8
    assert_eq!(schema.field(5).data_type(), &DataType::Utf8);
}

#[test]
fn test_missing_columns_become_nulls() {
    let rows = vec![row(json!({"a": 1, "b": "x"})), row(json!({"a": 2}))];
    let batch = rows_to_batch(&columns(&["a", "b"]), &rows).unwrap();

    assert_eq!(batch.num_rows(), 2);
    assert!(batch.column(1).is_null(1));

    let restored = batch_to_rows(&batch).unwrap();
    assert_eq!(restored[0]["b"], json!("x"));
    assert!(!restored[1].contains_key("b"));
}

#[tokio::test]
async fn test_full_load_replaces_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let pk = columns(&["record_id"]);

    let mut destination = ParquetDestination::new(dir.path()).unwrap();
    destination
        .write(
            "orders",
            &columns(&["record_id", "Name"]),
            vec![row(json!({"record_id": "rec1", "Name": "first"}))],
            &pk,
            LoadMode::Full,
        )
        .await
        .unwrap();
    destination.finish().await.unwrap();

    // Second run with different rows entirely replaces the file.
    let mut destination = ParquetDestination::new(dir.path()).unwrap();
    destination
        .write(
            "orders",
            &columns(&["record_id", "Name"]),
            vec![row(json!({"record_id": "rec2", "Name": "second"}))],
            &pk,
            LoadMode::Full,
        )
        .await
        .unwrap();
    let written = destination.finish().await.unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].rows, 1);

    let (_, rows) = read_back(&written[0].path);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["record_id"], json!("rec2"));
}

#[tokio::test]
async fn test_incremental_load_upserts_by_primary_key() {
    let dir = tempfile::tempdir().unwrap();
    let pk = columns(&["record_id"]);
    let cols = columns(&["record_id", "Name"]);

    let mut destination = ParquetDestination::new(dir.path()).unwrap();
    destination
        .write(
            "orders",
            &cols,
            vec![
                row(json!({"record_id": "rec1", "Name": "old"})),
                row(json!({"record_id": "rec2", "Name": "kept"})),
            ],
            &pk,
            LoadMode::Incremental,
        )
        .await
        .unwrap();
    destination.finish().await.unwrap();

    // Second run updates rec1 and introduces rec3.
    let mut destination = ParquetDestination::new(dir.path()).unwrap();
    destination
        .write(
            "orders",
            &cols,
            vec![
                row(json!({"record_id": "rec1", "Name": "new"})),
                row(json!({"record_id": "rec3", "Name": "added"})),
            ],
            &pk,
            LoadMode::Incremental,
        )
        .await
        .unwrap();
    let written = destination.finish().await.unwrap();
    assert_eq!(written[0].rows, 3);

    let (_, rows) = read_back(&written[0].path);
    let by_id: std::collections::HashMap<_, _> = rows
        .iter()
        .map(|r| (r["record_id"].as_str().unwrap(), r["Name"].as_str().unwrap()))
        .collect();
    assert_eq!(by_id["rec1"], "new");
    assert_eq!(by_id["rec2"], "kept");
    assert_eq!(by_id["rec3"], "added");
}

#[tokio::test]
async fn test_incremental_merge_unions_columns() {
    let dir = tempfile::tempdir().unwrap();
    let pk = columns(&["record_id"]);

    let mut destination = ParquetDestination::new(dir.path()).unwrap();
    destination
        .write(
            "orders",
            &columns(&["record_id", "Old"]),
            vec![row(json!({"record_id": "rec1", "Old": "v"}))],
            &pk,
            LoadMode::Incremental,
        )
        .await
        .unwrap();
    destination.finish().await.unwrap();

    let mut destination = ParquetDestination::new(dir.path()).unwrap();
    destination
        .write(
            "orders",
            &columns(&["record_id", "New"]),
            vec![row(json!({"record_id": "rec2", "New": "w"}))],
            &pk,
            LoadMode::Incremental,
        )
        .await
        .unwrap();
    let written = destination.finish().await.unwrap();

    let (cols, rows) = read_back(&written[0].path);
    assert_eq!(cols, vec!["record_id", "Old", "New"]);
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_multiple_flushes_accumulate_before_finish() {
    let dir = tempfile::tempdir().unwrap();
    let pk = columns(&["record_id"]);
    let cols = columns(&["record_id"]);

    let mut destination = ParquetDestination::new(dir.path()).unwrap();
    for id in ["rec1", "rec2", "rec3"] {
        destination
            .write(
                "orders",
                &cols,
                vec![row(json!({"record_id": id}))],
                &pk,
                LoadMode::Full,
            )
            .await
            .unwrap();
    }
    let written = destination.finish().await.unwrap();
    assert_eq!(written[0].rows, 3);
}

#[test]
fn test_composite_keys_distinguish_child_rows() {
    let pk = columns(&["orders_record_id", "_index"]);
    let existing = vec![
        row(json!({"orders_record_id": "rec1", "_index": "0", "x": 1})),
        row(json!({"orders_record_id": "rec1", "_index": "1", "x": 2})),
    ];
    let incoming = vec![row(
        json!({"orders_record_id": "rec1", "_index": "1", "x": 20}),
    )];

    let merged = super::writer::upsert(existing, incoming, &pk);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[1]["x"], json!(20));
}

#[test]
fn test_cloud_destination_parse_local() {
    let dir = tempfile::tempdir().unwrap();
    let destination = CloudDestination::parse(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(destination.scheme(), "file");
    assert!(!destination.is_cloud());
}

fn read_back(path: &std::path::Path) -> (Vec<String>, Vec<Row>) {
    let file = std::fs::File::open(path).unwrap();
    let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let mut cols = Vec::new();
    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.unwrap();
        if cols.is_empty() {
            cols = batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect();
        }
        rows.extend(batch_to_rows(&batch).unwrap());
    }
    (cols, rows)
}
