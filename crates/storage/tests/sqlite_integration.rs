use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_roundtrips_and_overwrites_values() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.load("flashcards").await.unwrap().is_none());

    repo.save("flashcards", b"{\"a\":1}").await.unwrap();
    repo.save("flashcards", b"{\"a\":2}").await.unwrap();
    let value = repo.load("flashcards").await.unwrap().expect("stored");
    assert_eq!(value, b"{\"a\":2}");
}

#[tokio::test]
async fn sqlite_remove_is_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_remove?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save("k", b"v").await.unwrap();
    repo.remove("k").await.unwrap();
    repo.remove("k").await.unwrap();
    assert!(repo.load("k").await.unwrap().is_none());
}

#[tokio::test]
async fn migrations_can_run_twice() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_sqlite_wires_the_key_value_store() {
    let storage = Storage::sqlite("sqlite:file:memdb_kv_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage.kv.save("k", b"v").await.unwrap();
    assert_eq!(storage.kv.load("k").await.unwrap().as_deref(), Some(&b"v"[..]));
}
