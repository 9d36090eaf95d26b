//! Concurrent access tests
//!
//! Independent `create` calls may run in parallel, each on its own
//! transaction; readers must never observe a parent without its full set of
//! children.
//! Run with: cargo test --test concurrent_access_tests

use aggwrite::{
    AggregateConfig, AggregateWriter, CollectionTemplate, Column, EntityTemplate, MemoryBackend,
    Payload,
};
use std::collections::HashSet;
use std::sync::Arc;

fn recipe_config() -> AggregateConfig {
    AggregateConfig::new(
        EntityTemplate::new("recipes").column(Column::new("title").required()),
    )
    .collection(
        "ingredients",
        CollectionTemplate::new("ingredients", "recipe_id", "sort_order")
            .column(Column::new("name").required()),
    )
}

async fn recipe_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.create_table("recipes").await.unwrap();
    backend.create_table("ingredients").await.unwrap();
    backend
}

#[tokio::test]
async fn test_parallel_creates_are_independent() {
    let backend = recipe_backend().await;
    let writer = Arc::new(AggregateWriter::new(backend.clone(), recipe_config()).unwrap());

    let mut handles = Vec::new();
    for n in 0..8 {
        let writer = Arc::clone(&writer);
        handles.push(tokio::spawn(async move {
            writer
                .create(
                    Payload::new().set("title", format!("recipe-{n}")),
                    vec![(
                        "ingredients".to_string(),
                        (0..3)
                            .map(|i| Payload::new().set("name", format!("item-{n}-{i}")))
                            .collect(),
                    )],
                )
                .await
                .unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 8);

    for id in ids {
        let mut children = backend
            .children_of("ingredients", "recipe_id", id)
            .await
            .unwrap();
        children.sort_by_key(|r| r.get("sort_order").and_then(|v| v.as_i64()).unwrap());

        assert_eq!(children.len(), 3);
        let positions: Vec<i64> = children
            .iter()
            .map(|r| r.get("sort_order").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }
}

#[tokio::test]
async fn test_readers_never_observe_partial_aggregate() {
    let backend = recipe_backend().await;
    let writer = Arc::new(AggregateWriter::new(backend.clone(), recipe_config()).unwrap());

    let writer_task = {
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            for n in 0..20 {
                writer
                    .create(
                        Payload::new().set("title", format!("recipe-{n}")),
                        vec![(
                            "ingredients".to_string(),
                            vec![
                                Payload::new().set("name", "first"),
                                Payload::new().set("name", "second"),
                            ],
                        )],
                    )
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let reader_task = {
        let backend = backend.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                for recipe in backend.rows("recipes").await.unwrap() {
                    let children = backend
                        .children_of("ingredients", "recipe_id", recipe.id)
                        .await
                        .unwrap();
                    // Every visible parent carries its complete child set.
                    assert_eq!(children.len(), 2, "partial aggregate observed");
                }
                tokio::task::yield_now().await;
            }
        })
    };

    writer_task.await.unwrap();
    reader_task.await.unwrap();

    assert_eq!(backend.row_count("recipes").await.unwrap(), 20);
    assert_eq!(backend.row_count("ingredients").await.unwrap(), 40);
}
