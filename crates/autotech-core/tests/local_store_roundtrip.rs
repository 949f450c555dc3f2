use std::sync::Arc;

use autotech_core::local::DEFAULT_STORAGE_KEY;
use autotech_core::{CoreError, InMemoryKeyValueStore, KeyValueStore, LocalCatalogStore, ModelInfo};
use autotech_domain::ProcedureDraft;

fn open() -> (Arc<InMemoryKeyValueStore>, LocalCatalogStore<Arc<InMemoryKeyValueStore>>) {
    let kv = Arc::new(InMemoryKeyValueStore::new());
    let store = LocalCatalogStore::open(kv.clone()).unwrap();
    (kv, store)
}

#[test]
fn export_then_import_reproduces_the_catalog() {
    let (_kv, mut store) = open();
    store.add_make("Audi").unwrap();
    store.add_model("Audi", &ModelInfo::new("A4 (B8)", "2008-2015")).unwrap();
    let draft = ProcedureDraft { title: "Cluster Repair".into(),
                                 category: "dashboard".into(),
                                 difficulty: "easy".into(),
                                 cost_min: Some(90),
                                 steps: vec!["Open".into(), "  ".into()],
                                 ..Default::default() };
    store.add_procedure("Audi", "A4 (B8)", draft.into_procedure().unwrap()).unwrap();

    let exported = store.export_data().unwrap();
    let before = store.makes().to_vec();
    store.reset_to_default().unwrap();
    assert_ne!(store.makes(), before.as_slice());

    store.import_data(&exported).unwrap();
    assert_eq!(store.makes(), before.as_slice());
    let audi = store.make("Audi").unwrap();
    let p = &audi.models[0].procedures[0];
    assert_eq!((p.cost.min(), p.cost.max()), (90, 90));
    assert_eq!(p.steps, vec!["Open"]);
}

#[test]
fn invalid_imports_leave_stored_catalog_untouched() {
    let (kv, mut store) = open();
    store.delete_make("Ford").unwrap();
    let stored = kv.get(DEFAULT_STORAGE_KEY).unwrap();
    let snapshot = store.makes().to_vec();

    for bad in ["{not json", r#"{"make": "BMW"}"#, r#"[{"make": ""}]"#, r#"[{"models": 3}]"#,
                r#"[{"make": "X", "models": [{"model": "Y", "procedures": [{"id": "p"}]}]}]"#] {
        let err = store.import_data(bad).unwrap_err();
        assert!(matches!(err, CoreError::Import(_)), "{bad}: {err:?}");
        assert_eq!(store.makes(), snapshot.as_slice());
        assert_eq!(kv.get(DEFAULT_STORAGE_KEY).unwrap(), stored);
    }
}

#[test]
fn reset_restores_the_seed_after_reopen() {
    let (kv, mut store) = open();
    store.delete_make("BMW").unwrap();
    store.reset_to_default().unwrap();
    let reopened = LocalCatalogStore::open(kv).unwrap();
    assert!(reopened.make("BMW").is_some());
    assert_eq!(reopened.makes().len(), 3);
}
