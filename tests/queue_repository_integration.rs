use portal_watcher::domain::entities::work_item::WorkItemState;
use portal_watcher::domain::value_objects::ids::DeliveryId;
use portal_watcher::infrastructure::db::postgres::PostgresDatabase;
use portal_watcher::infrastructure::db::postgres::work_item_store_postgres::WorkItemStorePostgres;
use portal_watcher::infrastructure::db::repositories::queue_repository::QueueRepository;
use portal_watcher::infrastructure::db::stores::work_item_store::WorkItemRepositoryError;
use std::sync::Arc;
use time::Duration;

fn test_db_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

async fn setup_repo() -> Option<QueueRepository> {
    let url = test_db_url()?;
    let db = Arc::new(PostgresDatabase::connect(&url, 2).await.ok()?);
    sqlx::raw_sql(include_str!("../migrations/0001_watcher.sql"))
        .execute(db.pool())
        .await
        .ok()?;
    Some(QueueRepository::new(Arc::new(WorkItemStorePostgres::new(db))))
}

/// Reserve until our own item comes up; other rows may be left over from earlier runs.
async fn reserve_own(repo: &QueueRepository, id: DeliveryId, worker_id: &str, lease: Duration) {
    for _ in 0..1_000 {
        let item = repo.reserve(worker_id, lease).await.unwrap();
        match item {
            Some(item) if item.id == id => return,
            Some(_) => continue,
            None => break,
        }
    }
    panic!("item {id} was never reserved");
}

#[tokio::test]
async fn given_work_item_when_processed_should_follow_queue_lifecycle() {
    let Some(repo) = setup_repo().await else {
        return;
    };

    // Enqueue.
    let item = repo
        .put(r#"{"type":"CREATE","application_id":7}"#.to_string())
        .await
        .unwrap();
    assert_eq!(item.state, WorkItemState::Ready);
    assert_eq!(item.reserve_count, 0);

    // Reserve counts the delivery and hands out a lease.
    reserve_own(&repo, item.id, "it-worker-1", Duration::seconds(60)).await;
    let stats = repo.stats(item.id).await.unwrap().unwrap();
    assert_eq!(stats.state, WorkItemState::Reserved);
    assert_eq!(stats.reserve_count, 1);

    // Only the holder may extend the lease.
    repo.touch(item.id, "it-worker-1", Duration::seconds(60))
        .await
        .unwrap();
    assert_eq!(
        repo.touch(item.id, "it-worker-2", Duration::seconds(60)).await,
        Err(WorkItemRepositoryError::NotFound)
    );

    // An expired lease makes the item reservable again.
    repo.touch(item.id, "it-worker-1", Duration::seconds(-1))
        .await
        .unwrap();
    reserve_own(&repo, item.id, "it-worker-2", Duration::seconds(60)).await;
    assert_eq!(repo.stats(item.id).await.unwrap().unwrap().reserve_count, 2);

    // Burying parks it; deleting removes it.
    repo.bury(item.id).await.unwrap();
    assert_eq!(
        repo.stats(item.id).await.unwrap().unwrap().state,
        WorkItemState::Buried
    );
    repo.delete(item.id).await.unwrap();
    assert!(repo.stats(item.id).await.unwrap().is_none());
    assert_eq!(
        repo.delete(item.id).await,
        Err(WorkItemRepositoryError::NotFound)
    );
}

#[tokio::test]
async fn given_blank_body_when_put_should_reject() {
    let Some(repo) = setup_repo().await else {
        return;
    };

    assert_eq!(
        repo.put("  ".to_string()).await.err(),
        Some(WorkItemRepositoryError::InvalidInput)
    );
}
