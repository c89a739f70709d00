use std::time::Duration;

use burrow_core::{ShortCode, UrlRecord};
use burrow_storage::{
    PostgresOptions, PostgresRepository, ReadRepository, Repository, StorageError,
};
use burrow_test_infra::postgres::{PostgresConfig, PostgresServer};

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRepository,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let repo = connect_with_retry(&url).await;

        Self {
            _postgres: postgres,
            repo,
        }
    }
}

async fn connect_with_retry(url: &str) -> PostgresRepository {
    let options = PostgresOptions::builder().max_connections(5).build();
    let mut last_error = None;

    for _ in 0..20 {
        match PostgresRepository::connect(url, &options).await {
            Ok(repo) => return repo,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn record(c: &str, url: &str, owner: &str) -> UrlRecord {
    UrlRecord::new(code(c), url, owner)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn save_and_resolve() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .save(record("abc123", "https://example.com", "u1"))
        .await
        .unwrap();

    let got = fixture.repo.resolve(&code("abc123")).await.unwrap();
    assert_eq!(got, "https://example.com");
    assert!(matches!(
        fixture.repo.resolve(&code("nope00")).await,
        Err(StorageError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn schema_bootstrap_is_idempotent() {
    let fixture = Fixture::start().await;

    fixture.repo.migrate().await.unwrap();
    fixture.repo.ping().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn code_collision_and_url_conflict_are_told_apart() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .save(record("abc123", "https://a.com", "u1"))
        .await
        .unwrap();

    let err = fixture
        .repo
        .save(record("abc123", "https://other.com", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::CodeAlreadyUsed(c) if c == code("abc123")));

    let err = fixture
        .repo
        .save(record("xyz789", "https://a.com", "u1"))
        .await
        .unwrap_err();
    match err {
        StorageError::UrlConflict {
            original_url,
            existing,
        } => {
            assert_eq!(original_url, "https://a.com");
            assert_eq!(existing, code("abc123"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // same code and same url: the code collision wins
    let err = fixture
        .repo
        .save(record("abc123", "https://a.com", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::CodeAlreadyUsed(_)));

    // another owner may shorten the same url
    fixture
        .repo
        .save(record("xyz789", "https://a.com", "u2"))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn delete_marks_record_gone_and_keeps_code_reserved() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .save(record("abc123", "https://a.com", "u1"))
        .await
        .unwrap();

    // foreign owner is skipped
    fixture
        .repo
        .delete_batch(&[code("abc123")], "u2")
        .await
        .unwrap();
    assert!(fixture.repo.resolve(&code("abc123")).await.is_ok());

    fixture
        .repo
        .delete_batch(&[code("abc123"), code("nope00")], "u1")
        .await
        .unwrap();
    assert!(matches!(
        fixture.repo.resolve(&code("abc123")).await,
        Err(StorageError::Gone(_))
    ));
    assert!(fixture.repo.list_by_owner("u1").await.unwrap().is_empty());

    let err = fixture
        .repo
        .save(record("abc123", "https://b.com", "u1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::CodeAlreadyUsed(_)));

    // the url is free again once its record is deleted
    fixture
        .repo
        .save(record("new001", "https://a.com", "u1"))
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn save_batch_rolls_back_on_conflict() {
    let fixture = Fixture::start().await;
    fixture
        .repo
        .save(record("taken1", "https://taken.com", "u1"))
        .await
        .unwrap();

    let err = fixture
        .repo
        .save_batch(vec![
            record("aaaaaa", "https://a.com", "u1"),
            record("bbbbbb", "https://taken.com", "u1"),
        ])
        .await
        .unwrap_err();
    assert!(
        matches!(err, StorageError::UrlConflict { existing, .. } if existing == code("taken1"))
    );
    assert!(matches!(
        fixture.repo.resolve(&code("aaaaaa")).await,
        Err(StorageError::NotFound(_))
    ));

    fixture
        .repo
        .save_batch(vec![
            record("aaaaaa", "https://a.com", "u1"),
            record("bbbbbb", "https://b.com", "u1"),
        ])
        .await
        .unwrap();

    let listed: Vec<_> = fixture
        .repo
        .list_by_owner("u1")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.short_code)
        .collect();
    assert_eq!(listed, [code("taken1"), code("aaaaaa"), code("bbbbbb")]);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn close_releases_the_pool() {
    let fixture = Fixture::start().await;

    fixture.repo.close().await.unwrap();

    let err = fixture.repo.ping().await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
}
