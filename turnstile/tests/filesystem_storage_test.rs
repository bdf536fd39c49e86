use tempfile::TempDir;
use turnstile::{
    Behavior, Effect, Snapshot, Token, Turnstile, Value,
    storage::{FilesystemStorage, Storage, StorageError},
};
use turnstile_test_harness::behaviors::{self, ACCOUNT, RECORDER};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn effect_with_output(n: i64) -> Effect {
    let mut effect = Effect::default();
    effect.output.push(turnstile::Output {
        address: Token::new("remote", "sink").unwrap(),
        message: Value::from(n),
    });
    effect
}

#[tokio::test]
async fn empty_directory_loads_nothing() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let storage = FilesystemStorage::new(temp_dir.path().join("not-yet-created"));

    assert!(storage.load_snapshot().await.unwrap().is_none());
    assert!(storage.load_log().await.unwrap().is_empty());
}

#[tokio::test]
async fn appended_effects_load_in_order() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let storage = FilesystemStorage::new(temp_dir.path());

    for n in 0..3 {
        storage.append_effect(effect_with_output(n)).await.unwrap();
    }

    // A fresh handle on the same directory sees the same log
    let reopened = FilesystemStorage::new(temp_dir.path());
    assert!(reopened.load_snapshot().await.unwrap().is_none());
    let log = reopened.load_log().await.unwrap();
    assert_eq!(
        log,
        vec![
            effect_with_output(0),
            effect_with_output(1),
            effect_with_output(2)
        ]
    );
}

#[tokio::test]
async fn snapshot_supersedes_earlier_log() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let storage = FilesystemStorage::new(temp_dir.path());

    storage.append_effect(effect_with_output(0)).await.unwrap();
    let snapshot = Snapshot {
        next_seq: Some(7),
        ..Snapshot::default()
    };
    storage.write_snapshot(snapshot.clone()).await.unwrap();
    storage.append_effect(effect_with_output(1)).await.unwrap();

    let reopened = FilesystemStorage::new(temp_dir.path());
    assert_eq!(reopened.load_snapshot().await.unwrap(), Some(snapshot));
    assert_eq!(
        reopened.load_log().await.unwrap(),
        vec![effect_with_output(1)]
    );
    assert!(temp_dir.path().join("snapshot.json").exists());
    assert!(!temp_dir.path().join("snapshot.json.tmp").exists());
    assert!(!temp_dir.path().join("log.0.jsonl").exists());
}

#[tokio::test]
async fn torn_final_entry_is_ignored() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let storage = FilesystemStorage::new(temp_dir.path());
    storage.append_effect(effect_with_output(0)).await.unwrap();

    let log_path = temp_dir.path().join("log.0.jsonl");
    let mut contents = tokio::fs::read_to_string(&log_path).await.unwrap();
    contents.push_str("{\"output\":[{\"addr");
    tokio::fs::write(&log_path, contents).await.unwrap();

    let reopened = FilesystemStorage::new(temp_dir.path());
    assert_eq!(
        reopened.load_log().await.unwrap(),
        vec![effect_with_output(0)]
    );
}

#[tokio::test]
async fn append_after_torn_entry_starts_a_fresh_line() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let storage = FilesystemStorage::new(temp_dir.path());
    storage.append_effect(effect_with_output(0)).await.unwrap();

    let log_path = temp_dir.path().join("log.0.jsonl");
    let intact = tokio::fs::read(&log_path).await.unwrap();
    let mut torn = intact.clone();
    torn.extend_from_slice(b"{\"output\":[{\"addr");
    tokio::fs::write(&log_path, torn).await.unwrap();

    let restarted = FilesystemStorage::new(temp_dir.path());
    assert_eq!(restarted.load_log().await.unwrap().len(), 1);
    assert_eq!(tokio::fs::read(&log_path).await.unwrap(), intact);

    restarted.append_effect(effect_with_output(1)).await.unwrap();
    let reloaded = FilesystemStorage::new(temp_dir.path());
    assert_eq!(
        reloaded.load_log().await.unwrap(),
        vec![effect_with_output(0), effect_with_output(1)]
    );
}

#[tokio::test]
async fn corrupt_entry_mid_log_is_an_error() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("log.0.jsonl");
    let good = effect_with_output(0).to_json().unwrap();
    tokio::fs::write(&log_path, format!("not json\n{good}\n"))
        .await
        .unwrap();

    let storage = FilesystemStorage::new(temp_dir.path());
    assert!(matches!(
        storage.load_log().await,
        Err(StorageError::Corrupt { .. })
    ));
}

#[tokio::test]
async fn runtime_recovers_from_disk() {
    init_logging();
    let temp_dir = TempDir::new().unwrap();
    let ok = Token::new("remote", "ok").unwrap();

    let turnstile = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(FilesystemStorage::new(temp_dir.path()))
        .load()
        .await
        .unwrap();
    let account = turnstile
        .create_actor(
            Behavior::new(ACCOUNT),
            [("balance", 42)].into_iter().collect::<Value>(),
        )
        .await
        .unwrap();
    let recorder = turnstile
        .create_actor(Behavior::new(RECORDER), Value::Null)
        .await
        .unwrap();
    turnstile.snapshot().await.unwrap();
    turnstile
        .send(account.clone(), behaviors::adjust(-2, &ok, &recorder))
        .await
        .unwrap();
    turnstile.send(recorder.clone(), "hello").await.unwrap();
    turnstile.stop().await;

    let reloaded = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(FilesystemStorage::new(temp_dir.path()))
        .load()
        .await
        .unwrap();

    // Both sends were queued before the stop, so after recovery they have
    // either been replayed or are dispatched again
    let state = loop {
        let state = reloaded.actor(&recorder).unwrap().state;
        if !behaviors::recorded(&state).is_empty() {
            break state;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    };
    assert_eq!(behaviors::recorded(&state), vec![Value::from("hello")]);
    assert_eq!(
        behaviors::balance(&reloaded.actor(&account).unwrap().state),
        40
    );
    reloaded.stop().await;
}
