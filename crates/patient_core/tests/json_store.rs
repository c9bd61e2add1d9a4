use patient_core::{
    Collection, CollectionStore, JsonFileStore, PatientDraft, PatientRepository, PatientService,
    RepoError, StoreConfig, StoreError, StorePatientRepository,
};
use std::fs;
use std::path::Path;

fn write_fixture(path: &Path, value: serde_json::Value) {
    fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn fixture() -> serde_json::Value {
    serde_json::json!({
        "P001": {"name": "Arun", "city": "Pune", "age": 24, "gender": "male", "height": 1.72, "weight": 70},
        "P002": {"name": "Bela", "city": "Goa", "age": 41, "gender": "female", "height": 1.63, "weight": 58.4},
        "P003": {"name": "Chen", "city": "Agra", "age": 67, "gender": "other", "height": 1.8, "weight": 101.35}
    })
}

#[test]
fn save_of_load_is_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    write_fixture(&path, fixture());
    let store = JsonFileStore::new(&path);

    let loaded = store.load().unwrap();
    store.save(&loaded).unwrap();
    let first_bytes = fs::read(&path).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, loaded);

    store.save(&reloaded).unwrap();
    assert_eq!(fs::read(&path).unwrap(), first_bytes);

    let on_disk: serde_json::Value = serde_json::from_slice(&first_bytes).unwrap();
    assert_eq!(on_disk, fixture_normalized());
}

// Integer weights come back as floats after a save.
fn fixture_normalized() -> serde_json::Value {
    let mut value = fixture();
    value["P001"]["weight"] = serde_json::json!(70.0);
    value
}

#[test]
fn legacy_derived_keys_are_dropped_on_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    write_fixture(
        &path,
        serde_json::json!({
            "P001": {
                "name": "Arun", "city": "Pune", "age": 24, "gender": "male",
                "height": 1.72, "weight": 70.0, "bmi": 23.66, "verdict": "Normal"
            }
        }),
    );
    let store = JsonFileStore::new(&path);

    store.save(&store.load().unwrap()).unwrap();

    let on_disk: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert!(on_disk["P001"].get("bmi").is_none());
    assert!(on_disk["P001"].get("verdict").is_none());
    assert_eq!(on_disk["P001"]["name"], "Arun");
}

#[test]
fn missing_file_is_a_store_error() {
    let dir = tempfile::tempdir().unwrap();
    let service = PatientService::new(StorePatientRepository::new(JsonFileStore::new(
        dir.path().join("absent.json"),
    )));

    let err = service.view_all().unwrap_err();
    assert!(matches!(err, RepoError::Store(StoreError::Missing(_))));
}

#[test]
fn malformed_documents_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    let store = JsonFileStore::new(&path);

    fs::write(&path, b"{ not json").unwrap();
    assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));

    fs::write(&path, b"[]").unwrap();
    assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));

    write_fixture(
        &path,
        serde_json::json!({
            "P001": {"name": "Arun", "city": "Pune", "age": 0, "gender": "male", "height": 1.72, "weight": 70}
        }),
    );
    assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));

    write_fixture(
        &path,
        serde_json::json!({
            " ": {"name": "Arun", "city": "Pune", "age": 24, "gender": "male", "height": 1.72, "weight": 70}
        }),
    );
    assert!(matches!(store.load(), Err(StoreError::InvalidEntry { .. })));
}

#[test]
fn failed_mutation_leaves_file_bytes_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    write_fixture(&path, fixture());
    let before = fs::read(&path).unwrap();
    let repo = StorePatientRepository::new(JsonFileStore::new(&path));

    let duplicate = patient_core::Patient::validate(&PatientDraft {
        id: "P002".to_string(),
        name: "Other".to_string(),
        city: "Goa".to_string(),
        age: 30,
        gender: "female".to_string(),
        height: 1.6,
        weight: 55.0,
    })
    .unwrap();
    assert!(matches!(
        repo.insert_patient(&duplicate),
        Err(RepoError::Conflict(_))
    ));
    assert!(matches!(
        repo.delete_patient("P404"),
        Err(RepoError::NotFound(_))
    ));

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn delete_keeps_other_entries_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    let store = JsonFileStore::new(&path);
    write_fixture(&path, fixture());
    store.save(&store.load().unwrap()).unwrap();

    let mut expected: Collection = store.load().unwrap();
    expected.remove("P002");
    let expected_dir = tempfile::tempdir().unwrap();
    let expected_store = JsonFileStore::new(expected_dir.path().join("expected.json"));
    expected_store.save(&expected).unwrap();

    let repo = StorePatientRepository::new(&store);
    repo.delete_patient("P002").unwrap();

    assert_eq!(
        fs::read(&path).unwrap(),
        fs::read(expected_store.path()).unwrap()
    );
}

#[test]
fn concurrent_inserts_through_one_repository_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    let store = JsonFileStore::new(&path);
    store.init_if_missing().unwrap();
    let repo = StorePatientRepository::new(store);

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let repo = &repo;
            scope.spawn(move || {
                for n in 0..5 {
                    let patient = patient_core::Patient::validate(&PatientDraft {
                        id: format!("W{worker}-{n}"),
                        name: "Worker".to_string(),
                        city: "Pune".to_string(),
                        age: 30,
                        gender: "other".to_string(),
                        height: 1.7,
                        weight: 65.0,
                    })
                    .unwrap();
                    repo.insert_patient(&patient).unwrap();
                }
            });
        }
    });

    assert_eq!(repo.load_collection().unwrap().len(), 20);
}

#[test]
fn config_opens_file_backed_service() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        data_path: dir.path().join("patience.json"),
        ..StoreConfig::default()
    };
    assert!(config.open_store().init_if_missing().unwrap());

    let service = config.open_service();
    service
        .create_patient(&PatientDraft {
            id: "P001".to_string(),
            name: "Arun".to_string(),
            city: "Pune".to_string(),
            age: 24,
            gender: "male".to_string(),
            height: 1.72,
            weight: 70.0,
        })
        .unwrap();

    let on_disk: serde_json::Value =
        serde_json::from_slice(&fs::read(&config.data_path).unwrap()).unwrap();
    assert_eq!(on_disk["P001"]["city"], "Pune");
    assert!(on_disk["P001"].get("id").is_none());
}
