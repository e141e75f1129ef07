use std::sync::Arc;

use insightplan::{DuckdbVectorRepository, VectorRecord, VectorRepository};
use serde_json::{json, Map, Value};
use tempfile::tempdir;

fn unit_vector(dim: usize, hot_index: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[hot_index] = 1.0;
    v
}

fn metadata(domain: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("domain".into(), json!(domain));
    metadata.insert("keywords".into(), json!(["orders", "revenue"]));
    metadata
}

#[tokio::test]
async fn duckdb_vector_repository_can_upsert_and_search() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("vectors.duckdb");

    let repo = Arc::new(DuckdbVectorRepository::new(&db_path).expect("duckdb init"));
    repo.create_collection("domain_contexts", 8).await.expect("create");

    repo.upsert(
        "domain_contexts",
        VectorRecord::new("domain_sales", unit_vector(8, 0), metadata("sales")),
    )
    .await
    .expect("upsert sales");
    repo.upsert(
        "domain_contexts",
        VectorRecord::new("domain_finance", unit_vector(8, 1), metadata("finance")),
    )
    .await
    .expect("upsert finance");

    let results = repo
        .search("domain_contexts", &unit_vector(8, 0), 3)
        .await
        .expect("search");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id(), "domain_sales");
    assert!(results[0].score() > 0.99, "expected near-identical score");
    assert_eq!(results[0].metadata_str("domain"), Some("sales"));
    assert_eq!(results[0].metadata_list("keywords"), vec!["orders", "revenue"]);
}

#[tokio::test]
async fn duckdb_vector_repository_upsert_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("vectors.duckdb");

    let repo = DuckdbVectorRepository::new(&db_path).expect("duckdb init");
    repo.create_collection("c", 4).await.expect("create");
    repo.create_collection("c", 4).await.expect("create twice");

    for _ in 0..3 {
        repo.upsert("c", VectorRecord::new("domain_sales", unit_vector(4, 2), metadata("sales")))
            .await
            .expect("upsert");
    }
    assert_eq!(repo.count("c").await.expect("count"), 1);

    repo.delete("c", "domain_sales").await.expect("delete");
    assert_eq!(repo.count("c").await.expect("count"), 0);
}

#[tokio::test]
async fn duckdb_vector_repository_rejects_wrong_dimension() {
    let repo = DuckdbVectorRepository::in_memory().expect("duckdb init");
    repo.create_collection("c", 4).await.expect("create");

    let err = repo
        .upsert("c", VectorRecord::new("x", unit_vector(3, 0), Map::new()))
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
}

#[tokio::test]
async fn duckdb_vector_repository_persists_across_reopen() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("vectors.duckdb");

    {
        let repo = DuckdbVectorRepository::new(&db_path).expect("duckdb init");
        repo.create_collection("c", 4).await.expect("create");
        repo.upsert_batch(
            "c",
            vec![
                VectorRecord::new("a", unit_vector(4, 0), metadata("sales")),
                VectorRecord::new("b", unit_vector(4, 1), metadata("finance")),
            ],
        )
        .await
        .expect("batch");
    }

    let repo = DuckdbVectorRepository::new(&db_path).expect("reopen");
    assert_eq!(repo.count("c").await.expect("count"), 2);
    let hits = repo.search("c", &unit_vector(4, 1), 1).await.expect("search");
    assert_eq!(hits[0].id(), "b");
}
