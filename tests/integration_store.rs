//! Postgres document store tests
//!
//! Run only when `DATABASE_URL` points at a migrated database.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::MutexGuard;

use scene_directory::aggregate::scene::SceneDraft;
use scene_directory::aggregate::tables;
use scene_directory::aggregate::{Record, Scene};
use scene_directory::cache::{CacheConfig, SceneCache};
use scene_directory::store::{DocumentStore, FieldWrite, Fields, Filter, PgDocumentStore};

mod common;

async fn store() -> Option<(MutexGuard<'static, ()>, PgDocumentStore)> {
    let (guard, pool) = common::setup_test_db().await?;
    Some((guard, PgDocumentStore::new(pool, Duration::from_secs(5))))
}

#[tokio::test]
async fn test_schema_is_complete() {
    let Some((_guard, pool)) = common::setup_test_db().await else {
        return;
    };
    assert!(scene_directory::db::check_schema(&pool).await.unwrap());
}

#[tokio::test]
async fn test_document_lifecycle() {
    let Some((_guard, store)) = store().await else {
        return;
    };

    let seq = store.next_sequence(tables::ROOM).await.unwrap();
    assert_eq!(store.next_sequence(tables::ROOM).await.unwrap(), seq + 1);

    store
        .create(tables::ROOM, "r1", seq, json!({ "uid": "r1", "scene": "s1", "quotes": ["x"] }))
        .await
        .unwrap();
    store
        .append_to_array_field(tables::ROOM, "r1", "quotes", json!("y"))
        .await
        .unwrap();
    store
        .remove_from_array_field(tables::ROOM, "r1", "quotes", json!("x"))
        .await
        .unwrap();

    let doc = store.find_by_id(tables::ROOM, "r1").await.unwrap().unwrap();
    assert_eq!(doc["quotes"], json!(["y"]));

    let found = store
        .find_many_by(tables::ROOM, &Filter::contains("quotes", "y"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(store.count(tables::ROOM, &Filter::eq("scene", "s1")).await.unwrap(), 1);

    store.tombstone(tables::ROOM, "r1", "admin").await.unwrap();
    assert!(store.find_by_id(tables::ROOM, "r1").await.unwrap().is_none());
    assert_eq!(store.count(tables::ROOM, &Filter::all()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_batch_commits_together() {
    let Some((_guard, store)) = store().await else {
        return;
    };
    store
        .create(tables::ROOM, "a", 1, json!({ "uid": "a", "quotes": ["x", "y"] }))
        .await
        .unwrap();
    store
        .create(tables::ROOM, "b", 2, json!({ "uid": "b", "quotes": [] }))
        .await
        .unwrap();

    store
        .apply_batch(vec![
            FieldWrite::new(tables::ROOM, "a", Fields::new().set("quotes", json!(["x"]))),
            FieldWrite::new(tables::ROOM, "b", Fields::new().set("quotes", json!(["y"]))),
        ])
        .await
        .unwrap();

    let a = store.find_by_id(tables::ROOM, "a").await.unwrap().unwrap();
    let b = store.find_by_id(tables::ROOM, "b").await.unwrap().unwrap();
    assert_eq!(a["quotes"], json!(["x"]));
    assert_eq!(b["quotes"], json!(["y"]));

    // a missing target rolls the whole batch back
    let result = store
        .apply_batch(vec![
            FieldWrite::new(tables::ROOM, "a", Fields::new().set("quotes", json!([]))),
            FieldWrite::new(tables::ROOM, "missing", Fields::new().set("quotes", json!([]))),
        ])
        .await;
    assert!(result.is_err());
    let a = store.find_by_id(tables::ROOM, "a").await.unwrap().unwrap();
    assert_eq!(a["quotes"], json!(["x"]));
}

#[tokio::test]
async fn test_cache_over_postgres() {
    let Some((_guard, store)) = store().await else {
        return;
    };
    let store = Arc::new(store);
    let cache = SceneCache::new(store.clone(), CacheConfig::default());
    let scene = cache
        .create_scene(
            SceneDraft {
                name: "Museum A".into(),
                ..Default::default()
            },
            "admin",
        )
        .await
        .unwrap();

    let reloaded = SceneCache::new(store, CacheConfig::default());
    assert_eq!(reloaded.load().await, 1);
    let fetched: Scene = reloaded.get_scene(scene.uid()).await.unwrap();
    assert_eq!(fetched.base.name, "Museum A");
    assert_eq!(Scene::TABLE, tables::SCENE);
}
