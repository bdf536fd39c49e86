use turnstile_core::{
    Behavior, CheckpointError, CommandResult, DurabilityError, DurabilityPolicy, Output,
    RuntimeConfig, RuntimeEvent, Token, Value, runtime::TurnPhase,
};
use turnstile_test_harness::{
    RuntimeHarness,
    behaviors::{self, ACCOUNT, RECORDER},
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn disk_full() -> CheckpointError {
    CheckpointError::DurabilityWrite(DurabilityError::new("disk full"))
}

/// Submit a send to `account` and run until its host effect has been
/// logged but not yet committed.
fn send_until_logged(harness: &mut RuntimeHarness, account: &Token, message: Value) {
    harness.submit(RuntimeEvent::send(account.clone(), message));
    // handle the send, which asks for the host effect to be logged
    assert!(harness.step());
    // perform the write
    assert!(harness.step());
}

#[test]
fn halted_runtime_retries_the_refused_turn_on_resume() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let account = harness.create_actor(
        Behavior::new(ACCOUNT),
        [("balance", 42)].into_iter().collect::<Value>(),
    );
    let ok = Token::new("remote", "ok").unwrap();

    send_until_logged(&mut harness, &account, behaviors::adjust(-13, &ok, &ok));
    // The turn dispatched once the send commits has its write refused
    harness.fail_next_log_writes(1);
    harness.run_until_quiescent();

    assert_eq!(harness.phase(), TurnPhase::Failed);
    assert_eq!(harness.durability_failures(), &[disk_full()]);
    assert_eq!(behaviors::balance(&harness.state_of(&account)), 42);
    assert!(harness.outbound().is_empty());
    // The event is still waiting to be processed
    assert_eq!(harness.pending_events().len(), 1);

    // Host commands are accepted while halted but nothing is dispatched
    let query = harness.submit(RuntimeEvent::send(
        account.clone(),
        behaviors::balance_query(&ok, &ok),
    ));
    harness.run_until_quiescent();
    assert_eq!(harness.take_result(query), None);
    assert_eq!(harness.phase(), TurnPhase::Failed);

    harness.resume();

    assert_eq!(harness.phase(), TurnPhase::Idle);
    assert_eq!(harness.take_result(query), Some(CommandResult::Sent));
    assert_eq!(behaviors::balance(&harness.state_of(&account)), 29);
    assert_eq!(
        harness.outbound(),
        &[
            Output {
                address: ok.clone(),
                message: Value::from(29)
            },
            Output {
                address: ok,
                message: Value::from(29)
            }
        ]
    );
}

#[test]
fn halted_host_effect_completes_after_resume() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    harness.fail_next_log_writes(1);

    let command_id = harness.submit(RuntimeEvent::create_actor(
        Behavior::new(RECORDER),
        Value::Null,
    ));
    harness.run_until_quiescent();
    assert_eq!(harness.take_result(command_id), None);
    assert!(harness.snapshot().created.is_empty());

    harness.resume();

    let Some(CommandResult::ActorCreated { token }) = harness.take_result(command_id) else {
        panic!("actor was not created after resume");
    };
    assert!(harness.actor(&token).is_some());
    assert_eq!(harness.effects_written(), 1);
}

#[test]
fn resume_without_failure_is_harmless() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let recorder = harness.create_actor(Behavior::new(RECORDER), Value::Null);
    harness.resume();
    harness.send(&recorder, 1);
    assert_eq!(
        behaviors::recorded(&harness.state_of(&recorder)),
        vec![Value::from(1)]
    );
}

#[test]
fn abort_policy_stops_the_runtime() {
    init_logging();
    let config = RuntimeConfig::default().with_durability_policy(DurabilityPolicy::Abort);
    let mut harness = RuntimeHarness::with_config(config, behaviors::registry());
    harness.fail_next_log_writes(1);

    let result = harness.dispatch(RuntimeEvent::create_actor(
        Behavior::new(RECORDER),
        Value::Null,
    ));

    assert_eq!(result, CommandResult::Failed { error: disk_full() });
    assert!(harness.is_stopped());
    assert!(harness.runtime().is_stopped());
    assert_eq!(harness.durability_failures(), &[disk_full()]);
}

#[test]
fn abort_during_turn_rejects_waiting_commands() {
    init_logging();
    let config = RuntimeConfig::default().with_durability_policy(DurabilityPolicy::Abort);
    let mut harness = RuntimeHarness::with_config(config, behaviors::registry());
    let account = harness.create_actor(
        Behavior::new(ACCOUNT),
        [("balance", 42)].into_iter().collect::<Value>(),
    );
    let ok = Token::new("remote", "ok").unwrap();

    send_until_logged(&mut harness, &account, behaviors::adjust(-13, &ok, &ok));
    let snapshot = harness.submit(RuntimeEvent::take_snapshot());
    harness.fail_next_log_writes(1);
    harness.run_until_quiescent();

    assert!(harness.is_stopped());
    assert!(matches!(
        harness.take_result(snapshot),
        Some(CommandResult::Rejected { .. })
    ));
    assert_eq!(behaviors::balance(&harness.state_of(&account)), 42);
}

#[test]
fn failed_snapshot_is_reported_and_processing_continues() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let recorder = harness.create_actor(Behavior::new(RECORDER), Value::Null);
    harness.fail_next_snapshot_writes(1);

    let result = harness.take_snapshot();

    let expected = CheckpointError::DurabilityWrite(DurabilityError::new(
        "snapshot store unavailable",
    ));
    assert_eq!(
        result,
        CommandResult::Failed {
            error: expected.clone()
        }
    );
    assert_eq!(harness.durability_failures(), &[expected]);
    assert_eq!(harness.phase(), TurnPhase::Idle);
    // The log still holds everything
    assert_eq!(harness.store().log_lines().len(), 1);

    harness.send(&recorder, "after");
    assert_eq!(behaviors::recorded(&harness.state_of(&recorder)).len(), 1);
}

#[test]
fn empty_host_effect_is_not_logged() {
    init_logging();
    let mut harness = RuntimeHarness::new();

    let result = harness.dispatch(RuntimeEvent::create_actor(
        Behavior::new("no-such-behavior"),
        Value::Null,
    ));

    assert!(matches!(result, CommandResult::Rejected { .. }));
    harness.run_until_quiescent();
    assert_eq!(harness.effects_written(), 0);
    assert!(harness.store().log_lines().is_empty());
}

#[test]
fn host_send_to_another_domain_is_logged_then_delivered() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let remote = Token::new("remote", "inbox").unwrap();

    let result = harness.dispatch(RuntimeEvent::send(remote.clone(), "hello"));

    assert_eq!(result, CommandResult::Sent);
    assert_eq!(harness.effects_written(), 1);
    assert_eq!(
        harness.outbound(),
        &[Output {
            address: remote,
            message: Value::from("hello")
        }]
    );
}

#[test]
fn token_of_a_refused_create_cannot_be_claimed_again() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let token = Token::new("checkpoint", "dup").unwrap();

    harness.fail_next_log_writes(1);
    let first = harness.submit(RuntimeEvent::create_actor_with_token(
        token.clone(),
        Behavior::new(RECORDER),
        Value::Null,
    ));
    harness.run_until_quiescent();
    assert_eq!(harness.phase(), TurnPhase::Failed);

    let second = harness.submit(RuntimeEvent::create_actor_with_token(
        token.clone(),
        Behavior::new(ACCOUNT),
        [("balance", 1)].into_iter().collect::<Value>(),
    ));
    harness.run_until_quiescent();
    assert!(matches!(
        harness.take_result(second),
        Some(CommandResult::Rejected { .. })
    ));

    harness.resume();
    assert_eq!(
        harness.take_result(first),
        Some(CommandResult::ActorCreated {
            token: token.clone()
        })
    );
    assert_eq!(
        harness.actor(&token).unwrap().behavior,
        Behavior::new(RECORDER)
    );
}

#[test]
fn host_values_without_a_logged_form_are_rejected() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let recorder = harness.create_actor(Behavior::new(RECORDER), Value::Null);
    let written = harness.effects_written();

    let send = harness.dispatch(RuntimeEvent::send(recorder.clone(), f64::NAN));
    assert!(matches!(send, CommandResult::Rejected { .. }));
    let create = harness.dispatch(RuntimeEvent::create_actor(
        Behavior::new(RECORDER),
        [("rate", f64::INFINITY)].into_iter().collect::<Value>(),
    ));
    assert!(matches!(create, CommandResult::Rejected { .. }));

    assert_eq!(harness.effects_written(), written);
    assert!(harness.durability_failures().is_empty());
    assert_eq!(harness.phase(), TurnPhase::Idle);
}
