//! Live integration tests for assetsync-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. They need `DATABASE_URL` pointing at a server the
//! harness can create databases on, so they are ignored by default:
//! `cargo test -p assetsync-db -- --ignored`.

use assetsync_db::{list_products, update_product_images, DbError, PgTargetStore};
use assetsync_pipeline::{CollaboratorError, TargetStore};

async fn insert_product(
    pool: &sqlx::PgPool,
    name: &str,
    legacy_name: Option<&str>,
    airtable_id: Option<&str>,
) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (name, legacy_name, airtable_id, images) \
         VALUES ($1, $2, $3, ARRAY['https://old.test/a.png']) RETURNING id",
    )
    .bind(name)
    .bind(legacy_name)
    .bind(airtable_id)
    .fetch_one(pool)
    .await
    .expect("insert product failed")
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn soft_deleted_products_are_not_listed(pool: sqlx::PgPool) {
    let live = insert_product(&pool, "Widget", None, None).await;
    let gone = insert_product(&pool, "Gadget", None, None).await;
    sqlx::query("UPDATE products SET deleted_at = NOW() WHERE id = $1")
        .bind(gone)
        .execute(&pool)
        .await
        .unwrap();

    let rows = list_products(&pool).await.expect("list_products failed");
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![live]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_replaces_image_list(pool: sqlx::PgPool) {
    let id = insert_product(&pool, "Widget", Some("Old Widget"), Some("rec1")).await;
    let urls = vec!["https://cdn.test/1.jpg".to_string(), "https://cdn.test/2.jpg".to_string()];

    update_product_images(&pool, id, &urls)
        .await
        .expect("update_product_images failed");

    let rows = list_products(&pool).await.unwrap();
    assert_eq!(rows[0].images, urls);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_of_missing_product_is_not_found(pool: sqlx::PgPool) {
    let err = update_product_images(&pool, 999_999, &[]).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn target_store_round_trips_through_trait(pool: sqlx::PgPool) {
    let id = insert_product(&pool, "Widget", Some("Old Widget"), Some("rec1")).await;
    let store = PgTargetStore::new(pool);

    let records = store.list_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id.to_string());
    assert_eq!(records[0].external_id.as_deref(), Some("rec1"));
    assert_eq!(records[0].alternate_names, vec!["Old Widget"]);

    store
        .update_asset_list(&id.to_string(), &["https://cdn.test/x.jpg".to_string()])
        .await
        .unwrap();
    let records = store.list_records().await.unwrap();
    assert_eq!(records[0].asset_urls, vec!["https://cdn.test/x.jpg"]);

    let err = store.update_asset_list("not-a-number", &[]).await.unwrap_err();
    assert!(matches!(err, CollaboratorError::NotFound(_)));
}
