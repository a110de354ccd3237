use ferrite::document::{path, Value};
use ferrite::engine::Engine;
use ferrite::errors::ErrorKind;
use ferrite::store::{FileStore, MemoryStore};
use ferrite::{doc, val};

fn engine() -> Engine {
    Engine::new(MemoryStore::new()).unwrap()
}

#[test]
fn insert_and_find() {
    let engine = engine();
    engine
        .insert(
            "db.c",
            vec![
                doc! { "_id": 1, "foo": "bar" },
                doc! { "_id": 2, "foo": "baz" },
            ],
            true,
        )
        .unwrap();

    let result = engine
        .find("db.c", &doc! { "foo": "bar" }, None, 0, 0)
        .unwrap();
    assert_eq!(result.matched.len(), 1);
    assert_eq!(path::get(&result.matched[0], "_id"), val!(1));
}

#[test]
fn unique_index_conflict_rejects_second_document() {
    let engine = engine();
    engine
        .create_index("db.c", &doc! { "a": 1 }, None, true)
        .unwrap();

    engine
        .insert("db.c", vec![doc! { "_id": 1, "a": 10 }], true)
        .unwrap();

    let result = engine
        .insert("db.c", vec![doc! { "_id": 2, "a": 10 }], true)
        .unwrap();
    assert!(result.modified.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].kind(),
        &ErrorKind::UniqueConstraintViolation
    );

    // the conflicting document was not added
    assert_eq!(engine.num_documents("db.c"), 1);
    let all = engine.find("db.c", &doc! {}, None, 0, 0).unwrap();
    assert_eq!(path::get(&all.matched[0], "_id"), val!(1));
}

#[test]
fn update_may_not_change_id() {
    let engine = engine();
    engine
        .insert("db.c", vec![doc! { "_id": 1, "foo": "bar" }], true)
        .unwrap();

    let err = engine
        .update(
            "db.c",
            &doc! { "_id": 1 },
            None,
            &doc! { "$set": doc! { "_id": 9 } },
            1,
            false,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ImmutableField);

    // the document still carries its original id
    let result = engine.find("db.c", &doc! { "_id": 1 }, None, 0, 0).unwrap();
    assert_eq!(result.matched.len(), 1);
    assert_eq!(path::get(&result.matched[0], "foo"), val!("bar"));
    assert!(engine
        .find("db.c", &doc! { "_id": 9 }, None, 0, 0)
        .unwrap()
        .matched
        .is_empty());
}

#[test]
fn upsert_seeds_document_from_query() {
    let engine = engine();

    let result = engine
        .update(
            "db.c",
            &doc! { "x": 5 },
            None,
            &doc! { "$set": doc! { "y": 7 } },
            1,
            true,
        )
        .unwrap();

    let upserted = result.upserted.expect("upsert inserts a document");
    assert!(matches!(path::get(&upserted, "_id"), Value::ObjectId(_)));
    assert_eq!(path::get(&upserted, "x"), val!(5));
    assert_eq!(path::get(&upserted, "y"), val!(7));

    // the document is findable afterwards
    let found = engine.find("db.c", &doc! { "x": 5 }, None, 0, 0).unwrap();
    assert_eq!(found.matched.len(), 1);
}

#[test]
fn upsert_with_replacement_reconciles_ids() {
    let engine = engine();

    let result = engine
        .replace(
            "db.c",
            &doc! { "_id": 7 },
            None,
            doc! { "name": "fresh" },
            true,
        )
        .unwrap();
    let upserted = result.upserted.unwrap();
    assert_eq!(path::get(&upserted, "_id"), val!(7));
    assert_eq!(path::get(&upserted, "name"), val!("fresh"));

    // conflicting ids between query and replacement fail
    let err = engine
        .replace(
            "db.c",
            &doc! { "_id": 8 },
            None,
            doc! { "_id": 9, "name": "clash" },
            true,
        )
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ImmutableField);
}

#[test]
fn set_on_insert_only_fires_on_upsert() {
    let engine = engine();
    engine
        .insert("db.c", vec![doc! { "_id": 1, "n": 1 }], true)
        .unwrap();

    // matched update skips $setOnInsert
    engine
        .update(
            "db.c",
            &doc! { "_id": 1 },
            None,
            &doc! { "$setOnInsert": doc! { "created": true }, "$inc": doc! { "n": 1 } },
            1,
            false,
        )
        .unwrap();
    let doc = engine.find("db.c", &doc! { "_id": 1 }, None, 0, 0).unwrap();
    assert_eq!(path::get(&doc.matched[0], "n"), val!(2));
    assert!(path::get(&doc.matched[0], "created").is_missing());

    // upsert applies it
    let result = engine
        .update(
            "db.c",
            &doc! { "_id": 2 },
            None,
            &doc! { "$setOnInsert": doc! { "created": true } },
            1,
            true,
        )
        .unwrap();
    let upserted = result.upserted.unwrap();
    assert_eq!(path::get(&upserted, "created"), val!(true));
}

#[test]
fn drop_with_wildcard_removes_matching_namespaces() {
    let engine = engine();
    for ns in ["app.users", "app.orders", "log.http"] {
        engine.insert(ns, vec![doc! { "_id": 1 }], true).unwrap();
    }

    engine.drop("app.*").unwrap();

    assert_eq!(engine.num_documents("app.users"), 0);
    assert_eq!(engine.num_documents("app.orders"), 0);
    assert_eq!(engine.num_documents("log.http"), 1);

    let dbs = engine.list_databases(&doc! {}).unwrap();
    assert_eq!(dbs.len(), 1);
    assert_eq!(path::get(&dbs[0], "name"), val!("log"));
}

#[test]
fn drop_treats_other_metacharacters_literally() {
    let engine = engine();
    engine
        .insert("db.users", vec![doc! { "_id": 1 }], true)
        .unwrap();
    engine
        .insert("dbxusers", vec![doc! { "_id": 1 }], true)
        .unwrap();

    // the dot must not act as a regex wildcard
    engine.drop("db.users").unwrap();
    assert_eq!(engine.num_documents("db.users"), 0);
    assert_eq!(engine.num_documents("dbxusers"), 1);
}

#[test]
fn queries_traverse_arrays_existentially() {
    let engine = engine();
    engine
        .insert(
            "db.c",
            vec![doc! {
                "_id": 1,
                "a": vec![
                    Value::Document(doc! { "b": 1 }),
                    Value::Document(doc! { "b": 2 }),
                    Value::Document(doc! { "b": 3 }),
                ],
            }],
            true,
        )
        .unwrap();

    for query in [
        doc! { "a.b": 2 },
        doc! { "a.1.b": 2 },
        doc! { "a.b": doc! { "$gt": 2 } },
        doc! { "a": doc! { "$elemMatch": doc! { "b": doc! { "$gte": 3 } } } },
    ] {
        let result = engine.find("db.c", &query, None, 0, 0).unwrap();
        assert_eq!(result.matched.len(), 1, "query {} missed", query);
    }

    let result = engine
        .find("db.c", &doc! { "a.b": 4 }, None, 0, 0)
        .unwrap();
    assert!(result.matched.is_empty());
}

#[test]
fn updates_allocate_new_handles() {
    let engine = engine();
    engine
        .insert("db.c", vec![doc! { "_id": 1, "n": 1 }], true)
        .unwrap();

    let before = engine.find("db.c", &doc! {}, None, 0, 0).unwrap();
    engine
        .update(
            "db.c",
            &doc! { "_id": 1 },
            None,
            &doc! { "$inc": doc! { "n": 1 } },
            1,
            false,
        )
        .unwrap();

    // the handle captured before the update still shows the old content
    assert_eq!(path::get(&before.matched[0], "n"), val!(1));
    let after = engine.find("db.c", &doc! {}, None, 0, 0).unwrap();
    assert_eq!(path::get(&after.matched[0], "n"), val!(2));
}

#[test]
fn file_store_survives_engine_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data.db");

    {
        let engine = Engine::new(FileStore::new(&db_path)).unwrap();
        engine
            .create_index("app.users", &doc! { "email": 1 }, None, true)
            .unwrap();
        engine
            .insert(
                "app.users",
                vec![
                    doc! { "_id": 1, "email": "a@x.io", "profile": doc! { "z": 1, "a": 2 } },
                    doc! { "_id": 2, "email": "b@x.io" },
                ],
                true,
            )
            .unwrap();
    }

    let engine = Engine::new(FileStore::new(&db_path)).unwrap();
    assert_eq!(engine.num_documents("app.users"), 2);

    // key order survived the round trip
    let result = engine
        .find("app.users", &doc! { "_id": 1 }, None, 0, 0)
        .unwrap();
    let keys: Vec<_> = result.matched[0].keys().collect();
    assert_eq!(keys, ["_id", "email", "profile"]);

    // the unique index survived and still rejects duplicates
    let conflict = engine
        .insert("app.users", vec![doc! { "_id": 3, "email": "a@x.io" }], true)
        .unwrap();
    assert_eq!(conflict.errors.len(), 1);
    assert_eq!(engine.num_documents("app.users"), 2);
}

#[test]
fn concurrent_mutations_stay_consistent() {
    use std::sync::Arc;
    use std::thread;

    let engine = Arc::new(engine());

    let mut handles = vec![];
    for worker in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let id = worker * 1000 + i;
                engine
                    .insert("db.c", vec![doc! { "_id": id, "w": worker }], true)
                    .unwrap();
                engine
                    .update(
                        "db.c",
                        &doc! { "_id": id },
                        None,
                        &doc! { "$set": doc! { "touched": true } },
                        1,
                        false,
                    )
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.num_documents("db.c"), 200);
    let touched = engine
        .find("db.c", &doc! { "touched": true }, None, 0, 0)
        .unwrap();
    assert_eq!(touched.matched.len(), 200);
}
