#![cfg(feature = "tokio")]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::StreamExt;
use turnstile::{
    Behavior, CheckpointError, CommandError, Effect, Output, RuntimeConfig, Snapshot, Token,
    Turnstile, Value,
    storage::{InMemoryStorage, Storage, StorageError},
    transport::ChannelTransport,
};
use turnstile_test_harness::behaviors::{self, ACCOUNT, PING, PONG, RECORDER, TRANSFER};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn remote(id: &str) -> Token {
    Token::new("remote", id).unwrap()
}

#[tokio::test]
async fn smoke() {
    init_logging();
    let (transport, mut outputs) = ChannelTransport::new();
    let turnstile = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_transport(transport)
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
    let ok = remote("ok");
    turnstile
        .send(account.clone(), behaviors::adjust(-13, &ok, &ok))
        .await
        .unwrap();

    let output = outputs.next().await.unwrap();
    assert_eq!(
        output,
        Output {
            address: ok,
            message: Value::from(29)
        }
    );
    assert_eq!(
        behaviors::balance(&turnstile.actor(&account).unwrap().state),
        29
    );
    turnstile.stop().await;
}

#[tokio::test]
async fn transfer_survives_restart() {
    init_logging();
    let storage = InMemoryStorage::new();
    let (transport, mut outputs) = ChannelTransport::new();
    let turnstile = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(storage.clone())
        .with_transport(transport)
        .load()
        .await
        .unwrap();

    let src = turnstile
        .create_actor(
            Behavior::new(ACCOUNT),
            [("balance", 42)].into_iter().collect::<Value>(),
        )
        .await
        .unwrap();
    let dst = turnstile
        .create_actor(
            Behavior::new(ACCOUNT),
            [("balance", 0)].into_iter().collect::<Value>(),
        )
        .await
        .unwrap();
    let transfer = turnstile
        .create_actor(Behavior::new(TRANSFER), Value::Null)
        .await
        .unwrap();
    let ok = remote("ok");
    turnstile
        .send(
            transfer,
            behaviors::transfer_request(&src, &dst, 13, &ok, &ok),
        )
        .await
        .unwrap();
    // The reply only goes out once every step of the transfer has committed
    assert_eq!(outputs.next().await.unwrap().message, Value::from(13));
    turnstile.stop().await;

    let reloaded = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(storage)
        .load()
        .await
        .unwrap();
    assert_eq!(
        behaviors::balance(&reloaded.actor(&src).unwrap().state),
        29
    );
    assert_eq!(
        behaviors::balance(&reloaded.actor(&dst).unwrap().state),
        13
    );
    reloaded.stop().await;
}

#[tokio::test]
async fn snapshot_then_restart_restores_cycles() {
    init_logging();
    let storage = InMemoryStorage::new();
    let turnstile = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(storage.clone())
        .load()
        .await
        .unwrap();

    let ping = Token::new("checkpoint", "ping").unwrap();
    let pong = Token::new("checkpoint", "pong").unwrap();
    let done = turnstile
        .create_actor(Behavior::new(RECORDER), Value::Null)
        .await
        .unwrap();
    turnstile
        .create_actor_with_token(
            ping.clone(),
            Behavior::new(PING),
            [("peer", Value::from(&pong)), ("pings", Value::from(0))]
                .into_iter()
                .collect::<Value>(),
        )
        .await
        .unwrap();
    turnstile
        .create_actor_with_token(
            pong.clone(),
            Behavior::new(PONG),
            [
                ("peer", Value::from(&ping)),
                ("done", Value::from(&done)),
                ("pongs", Value::from(0)),
            ]
            .into_iter()
            .collect::<Value>(),
        )
        .await
        .unwrap();

    let snapshot = turnstile.snapshot().await.unwrap();
    assert_eq!(snapshot.len(), 3);
    assert!(storage.has_snapshot());
    assert_eq!(storage.log_len(), 0);
    turnstile.stop().await;

    let reloaded = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(storage)
        .load()
        .await
        .unwrap();
    assert_eq!(
        reloaded.actor(&ping).unwrap().state.ref_field("peer").unwrap(),
        &pong
    );
    assert_eq!(
        reloaded.actor(&pong).unwrap().state.ref_field("peer").unwrap(),
        &ping
    );
    reloaded.stop().await;
}

#[tokio::test]
async fn unknown_behavior_is_rejected() {
    init_logging();
    let turnstile = Turnstile::build_tokio().load().await.unwrap();

    let result = turnstile
        .create_actor(Behavior::new("nope"), Value::Null)
        .await;

    assert!(matches!(result, Err(CommandError::Rejected(_))));
    turnstile.stop().await;
}

#[tokio::test]
async fn commands_after_stop_fail() {
    init_logging();
    let turnstile = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .load()
        .await
        .unwrap();
    turnstile.stop().await;

    let result = turnstile
        .create_actor(Behavior::new(RECORDER), Value::Null)
        .await;
    assert!(matches!(result, Err(CommandError::Stopped(_))));
}

/// Refuses the next `failures` log writes.
#[derive(Clone)]
struct FlakyStorage {
    inner: InMemoryStorage,
    failures: Arc<AtomicUsize>,
}

impl Storage for FlakyStorage {
    fn append_effect(&self, effect: Effect) -> impl Future<Output = Result<(), StorageError>> + Send {
        let refuse = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let inner = self.inner.clone();
        async move {
            if refuse {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            inner.append_effect(effect).await
        }
    }

    fn write_snapshot(
        &self,
        snapshot: Snapshot,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        self.inner.write_snapshot(snapshot)
    }

    fn load_snapshot(&self) -> impl Future<Output = Result<Option<Snapshot>, StorageError>> + Send {
        self.inner.load_snapshot()
    }

    fn load_log(&self) -> impl Future<Output = Result<Vec<Effect>, StorageError>> + Send {
        self.inner.load_log()
    }
}

#[tokio::test]
async fn halted_runtime_resumes() {
    init_logging();
    let storage = FlakyStorage {
        inner: InMemoryStorage::new(),
        failures: Arc::new(AtomicUsize::new(1)),
    };
    let turnstile = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(storage.clone())
        .load()
        .await
        .unwrap();

    let create = tokio::spawn(
        turnstile.create_actor(Behavior::new(RECORDER), Value::Null),
    );

    // Wait for the refused write to be reported
    let failures = loop {
        let failures = turnstile.take_durability_failures();
        if !failures.is_empty() {
            break failures;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert!(matches!(failures[0], CheckpointError::DurabilityWrite(_)));
    assert!(!create.is_finished());

    turnstile.resume();
    let token = create.await.unwrap().unwrap();
    assert!(turnstile.actor(&token).is_some());
    assert_eq!(storage.inner.log_len(), 1);
    turnstile.stop().await;
}

#[tokio::test]
async fn restart_with_missing_behavior_fails_to_load() {
    init_logging();
    let storage = InMemoryStorage::new();
    let turnstile = Turnstile::build_tokio()
        .with_registry(behaviors::registry())
        .with_storage(storage.clone())
        .with_config(RuntimeConfig::default().with_snapshot_every(1))
        .load()
        .await
        .unwrap();
    turnstile
        .create_actor(Behavior::new(RECORDER), Value::Null)
        .await
        .unwrap();
    turnstile.stop().await;

    let result = Turnstile::build_tokio().with_storage(storage).load().await;
    assert!(matches!(
        result.map(|_| ()),
        Err(turnstile::LoadError(CheckpointError::UnknownBehavior(_)))
    ));
}
