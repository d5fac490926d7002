//! Integration tests for the Sled record store and JSON dumps.

mod common;

use common::{converted, package};
use formport::convert::augment::{lock_gating_procedures, lock_gating_slots};
use formport::convert::augment;
use formport::records::{
    export_container_json, import_container_json, Category, Collection, Container, FormId,
    RecordBody, RecordStore, StoreError,
};
use tempfile::TempDir;

#[test]
fn containers_survive_reopening_the_store() {
    let dir = TempDir::new().expect("tempdir");
    let db_path = dir.path().join("records");
    {
        let store = RecordStore::open(&db_path).expect("open");
        let mut collection = Collection::new();
        let output = collection.add_container(Container::new("GECK.esp", 2));
        let first = collection
            .add_record(output, converted(0, Category::Door).with_key("TES4NewDoor"))
            .expect("add");
        assert_eq!(first, FormId(0x0200_0800));
        let container = collection.container_mut(output).expect("output");
        assert_eq!(store.save_container(container).expect("save"), 1);
    }

    let store = RecordStore::open(&db_path).expect("reopen");
    assert_eq!(store.list_containers().expect("list"), vec!["geck.esp"]);
    assert!(store.contains("Geck.ESP").expect("contains"));

    let mut collection = store.load_collection(&["GECK.esp"]).expect("load");
    let output = collection.find_container("geck.esp").expect("found");
    let reloaded = collection.container(output).expect("output");
    assert_eq!(reloaded.load_order, 2);
    assert_eq!(reloaded.dirty_count(), 0);
    let door = reloaded
        .get(Category::Door, FormId(0x0200_0800))
        .expect("door");
    assert_eq!(door.label(), "TES4NewDoor");

    // id allocation continues where the previous run stopped
    let second = collection
        .add_record(output, converted(0, Category::Door))
        .expect("add");
    assert_eq!(second, FormId(0x0200_0801));
}

#[test]
fn package_trees_round_trip_through_the_store() {
    let dir = TempDir::new().expect("tempdir");
    let store = RecordStore::open(dir.path()).expect("open");

    let mut record = package(1, 0x0100, "TES4TravelLockTemplate", &["Acquire", "Travel"]);
    let tree = augment(
        record.package().expect("package"),
        &lock_gating_slots(),
        &lock_gating_procedures(),
    );
    record.body = RecordBody::Package(tree);
    record.mark_dirty();
    let mut container = Container::new("Skyblivion.esm", 1);
    container.insert(record.clone());
    store.save_container(&mut container).expect("save");

    let loaded = store.load_container("Skyblivion.esm").expect("load");
    let stored = loaded
        .pool(Category::Package)
        .and_then(|pool| pool.get(FormId(0x0100_0100)))
        .expect("stored package");
    assert_eq!(stored.package().expect("package"), record.package().expect("package"));
    stored
        .package()
        .expect("package")
        .check_invariants()
        .expect("consistent after reload");
}

#[test]
fn dropped_container_is_gone() {
    let dir = TempDir::new().expect("tempdir");
    let store = RecordStore::open(dir.path()).expect("open");
    let mut container = Container::new("Oblivion.esm", 0);
    store.save_container(&mut container).expect("save");
    assert!(store.contains("Oblivion.esm").expect("contains"));

    assert!(store.drop_container("Oblivion.esm").expect("drop"));
    assert!(!store.contains("Oblivion.esm").expect("contains"));
    assert!(matches!(
        store.load_container("Oblivion.esm"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn json_import_then_save_then_export_keeps_records() {
    let dir = TempDir::new().expect("tempdir");
    let dump = dir.path().join("master.json");
    std::fs::write(
        &dump,
        r#"{
  "name": "Skyblivion.esm",
  "load_order": 1,
  "records": [
    {
      "form_id": 16781876,
      "editor_key": "TES4GateDoor",
      "category": "DOOR",
      "body": { "target": { "behavior": null } }
    },
    {
      "form_id": 16781877,
      "category": "LVLN",
      "body": "plain"
    }
  ]
}"#,
    )
    .expect("write dump");

    let store = RecordStore::open(dir.path().join("records")).expect("open");
    let mut container = import_container_json(&dump).expect("import");
    assert_eq!(container.dirty_count(), 2);
    assert_eq!(store.save_container(&mut container).expect("save"), 2);

    let loaded = store.load_container("Skyblivion.esm").expect("load");
    let door = loaded
        .get(Category::Door, FormId(0x0100_1234))
        .expect("door");
    assert_eq!(door.target().expect("target").template, None);

    let out = dir.path().join("export.json");
    export_container_json(&loaded, &out).expect("export");
    let again = import_container_json(&out).expect("reimport");
    assert_eq!(again.len(), 2);
    assert_eq!(again.load_order, 1);
}

#[test]
fn malformed_dump_is_a_json_error() {
    let dir = TempDir::new().expect("tempdir");
    let dump = dir.path().join("broken.json");
    std::fs::write(&dump, "{ \"name\": ").expect("write");
    assert!(matches!(import_container_json(&dump), Err(StoreError::Json(_))));
    assert!(matches!(
        import_container_json(dir.path().join("missing.json")),
        Err(StoreError::Io(_))
    ));
}
