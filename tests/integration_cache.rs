//! Cache integration tests over the in-memory store

use scene_directory::aggregate::area::AreaDraft;
use scene_directory::aggregate::device::DeviceDraft;
use scene_directory::aggregate::group::GroupDraft;
use scene_directory::aggregate::scene::SceneDraft;
use scene_directory::aggregate::Record;
use scene_directory::cache::AreaUpdate;

mod common;

fn scene_draft(name: &str) -> SceneDraft {
    SceneDraft {
        name: name.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_museum_end_to_end() {
    let (_, cache) = common::memory_cache();

    let scene = cache.create_scene(scene_draft("Museum A"), "admin").await.unwrap();
    let room = cache
        .create_room(scene.uid(), "Hall 1", "", "admin")
        .await
        .unwrap();
    let area = cache
        .create_area(
            scene.uid(),
            AreaDraft {
                name: "Wall".into(),
                parent: room.uid().to_string(),
                kind: 1,
                ..Default::default()
            },
            "admin",
        )
        .await
        .unwrap();
    cache
        .create_device(
            DeviceDraft {
                sn: "DEV-001".into(),
                ..Default::default()
            },
            "admin",
        )
        .await
        .unwrap();

    let area = cache
        .update_area(area.uid(), AreaUpdate::Serial("DEV-001".into()), "admin")
        .await
        .unwrap();
    assert_eq!(area.device_serial(&cache).await.unwrap(), "DEV-001");
    assert_eq!(area.kind, 1);

    // no cascade: children keep pointing at the removed scene
    cache.remove_scene(scene.uid(), "admin").await.unwrap();
    assert!(cache.get_scene(scene.uid()).await.is_err());
    assert_eq!(cache.get_area(area.uid()).await.unwrap().scene, scene.uid());
}

#[tokio::test]
async fn test_quote_exclusivity() {
    let (_, cache) = common::memory_cache();
    let scene = cache.create_scene(scene_draft("Museum A"), "admin").await.unwrap();
    let a = cache.create_room(scene.uid(), "A", "", "admin").await.unwrap();
    let b = cache.create_room(scene.uid(), "B", "", "admin").await.unwrap();

    cache
        .assign_quotes(a.uid(), vec!["x".into(), "y".into()], "admin")
        .await
        .unwrap();
    cache
        .assign_quotes(b.uid(), vec!["y".into(), "z".into()], "admin")
        .await
        .unwrap();

    assert_eq!(cache.get_room(a.uid()).await.unwrap().quotes, vec!["x".to_string()]);
    assert_eq!(
        cache.get_room(b.uid()).await.unwrap().quotes,
        vec!["y".to_string(), "z".to_string()]
    );
}

#[tokio::test]
async fn test_group_names_unique_per_scene() {
    let (_, cache) = common::memory_cache();
    let first = cache.create_scene(scene_draft("Museum A"), "admin").await.unwrap();
    let second = cache.create_scene(scene_draft("Museum B"), "admin").await.unwrap();
    let draft = || GroupDraft {
        name: "Guides".into(),
        ..Default::default()
    };

    cache.create_group(first.uid(), draft(), "admin").await.unwrap();
    assert!(cache.create_group(first.uid(), draft(), "admin").await.is_err());
    cache.create_group(second.uid(), draft(), "admin").await.unwrap();
}

#[tokio::test]
async fn test_registry_reload_from_store() {
    let (store, cache) = common::memory_cache();
    cache.create_scene(scene_draft("Museum A"), "admin").await.unwrap();
    cache.create_scene(scene_draft("Museum B"), "admin").await.unwrap();

    let fresh = scene_directory::cache::SceneCache::new(store, Default::default());
    assert_eq!(fresh.load().await, 2);
    assert_eq!(fresh.list_scenes(0, 10).await.total, 2);
}
