//! Integration tests for the KITTI adapter.

use std::fs;

use beardstore::adapter::kitti;
use beardstore::ir::{BBox, Record, Split, Value};
use beardstore::loader::{self, LoadIssueCode, LoadOptions};
use beardstore::writer::{self, StoreOptions};

mod common;
use common::create_kitti_dataset;

#[test]
fn read_kitti_from_root_succeeds() {
    let temp = tempfile::tempdir().expect("create temp dir");
    create_kitti_dataset(temp.path());

    let (config, mut loader) =
        kitti::load(temp.path(), None, LoadOptions::default()).expect("open kitti dataset");
    assert_eq!(config.boxes.len(), 9);

    let records: Vec<Record> = loader
        .by_ref()
        .collect::<Result<Vec<_>, _>>()
        .expect("load records");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].split, Split::Training);
    assert_eq!(records[2].split, Split::Testing);

    let pedestrian = &records[0].objects[0];
    assert_eq!(pedestrian["class"], Value::Str("Pedestrian".into()));
    assert_eq!(pedestrian["occluded"], Value::Int(0));
    assert_eq!(
        pedestrian["bbox"],
        Value::Box(BBox::from_yxyx(3.0, 12.40, 30.92, 40.73))
    );
    assert_eq!(
        pedestrian["location"],
        Value::Array(vec![
            Value::Float(1.84),
            Value::Float(1.47),
            Value::Float(8.41)
        ])
    );
    assert_eq!(pedestrian["score"], Value::Null);

    assert_eq!(records[1].objects.len(), 2);
    assert_eq!(records[1].objects[1]["class"], Value::Str("DontCare".into()));
    assert!(records[2].objects.is_empty());

    let report = loader.report();
    assert_eq!(report.records(), 3);
    assert_eq!(report.issues_with(LoadIssueCode::MissingLabelFile).count(), 1);
}

#[test]
fn custom_class_list_flags_unknown_types() {
    let temp = tempfile::tempdir().expect("create temp dir");
    create_kitti_dataset(temp.path());

    let classes = vec!["Car".to_string()];
    let (_, mut loader) = kitti::load(
        temp.path(),
        Some(classes.as_slice()),
        LoadOptions::default().only([Split::Training]),
    )
    .expect("open kitti dataset");
    let records: Vec<Record> = loader
        .by_ref()
        .collect::<Result<Vec<_>, _>>()
        .expect("load records");

    assert_eq!(records[0].objects[0]["class"], Value::Str("UNKNOWN".into()));
    assert_eq!(records[1].objects[0]["class"], Value::Str("Car".into()));
    assert_eq!(
        loader
            .report()
            .issues_with(LoadIssueCode::EnumOutOfRange)
            .count(),
        2
    );
}

#[test]
fn kitti_records_store_as_generic_dataset() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let source = temp.path().join("kitti");
    let target = temp.path().join("beard");
    create_kitti_dataset(&source);

    let (config, records) = kitti::load(
        &source,
        None,
        LoadOptions::default().only([Split::Training]),
    )
    .expect("open kitti dataset");
    let stored = writer::store(
        records,
        &config,
        &target,
        StoreOptions::default().image_extension("png"),
    )
    .expect("prepare output")
    .collect::<Result<Vec<_>, _>>()
    .expect("store records");
    assert_eq!(stored.len(), 2);

    let label = fs::read_to_string(target.join("train/labels/000001.txt")).expect("read label");
    let first = label.lines().next().expect("first object line");
    assert_eq!(
        first,
        "Car 0.00 0 1.85 1 38 37 100 1.67 1.87 3.69 -16.53 2.39 58.49 1.57"
    );

    // The written config describes the stored boxes, so the generic loader reads them back.
    let (_, reloaded) = loader::load(&target, None, LoadOptions::default()).expect("reopen");
    let reloaded: Vec<Record> = reloaded
        .collect::<Result<Vec<_>, _>>()
        .expect("reload records");
    assert_eq!(reloaded.len(), 2);
    assert_eq!(
        reloaded[1].objects[0]["bbox"],
        Value::Box(BBox::from_yxyx(1.0, 38.0, 37.0, 100.0))
    );
    assert_eq!(reloaded[1].objects[0]["class"], Value::Str("Car".into()));
}

#[test]
fn missing_kitti_folder_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    assert!(kitti::load(&temp.path().join("absent"), None, LoadOptions::default()).is_err());
}
