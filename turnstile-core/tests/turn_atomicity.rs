use turnstile_core::{
    Behavior, Effect, ExceptionKind, RuntimeConfig, Token, Value, runtime::TurnPhase,
};
use turnstile_test_harness::{
    RuntimeHarness,
    behaviors::{self, ACCOUNT, FAULTY, PANICKY, RECORDER},
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn faulty_request(fail: bool, witness: &Token) -> Value {
    [("fail", Value::from(fail)), ("witness", Value::from(witness))]
        .into_iter()
        .collect()
}

fn last_logged_effect(harness: &RuntimeHarness) -> Effect {
    let line = harness.store().log_lines().last().expect("nothing logged");
    Effect::from_json(line).unwrap()
}

#[test]
fn successful_turn_applies_everything() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let witness = harness.create_actor(Behavior::new(RECORDER), Value::Null);
    let faulty = harness.create_actor(
        Behavior::new(FAULTY),
        [("count", 0)].into_iter().collect::<Value>(),
    );

    harness.send(&faulty, faulty_request(false, &witness));

    let memento = harness.actor(&faulty).unwrap();
    assert_eq!(memento.state.int_field("count").unwrap(), 1);
    assert_eq!(memento.behavior, Behavior::new(RECORDER));

    // The witness was told about the child, and the child exists
    let received = behaviors::recorded(&harness.state_of(&witness));
    assert_eq!(received.len(), 1);
    let child = received[0].as_token().unwrap().clone();
    assert!(harness.actor(&child).is_some());
    assert!(harness.turn_faults().is_empty());
}

#[test]
fn failed_turn_is_rolled_back_entirely() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let witness = harness.create_actor(Behavior::new(RECORDER), Value::Null);
    let faulty = harness.create_actor(
        Behavior::new(FAULTY),
        [("count", 0)].into_iter().collect::<Value>(),
    );
    let before = harness.actor(&faulty).unwrap();

    harness.send(&faulty, faulty_request(true, &witness));

    // State, behavior, creations and sends are all discarded
    assert_eq!(harness.actor(&faulty).unwrap(), before);
    assert!(behaviors::recorded(&harness.state_of(&witness)).is_empty());
    assert_eq!(harness.snapshot().created.len(), 2);
    assert!(harness.pending_events().is_empty());

    let faults = harness.turn_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].token, faulty);
    assert_eq!(faults[0].exception.kind, ExceptionKind::Behavior);
    assert_eq!(faults[0].exception.message, "asked to fail");

    // The aborted effect is still in the log, with what it would have done
    let logged = last_logged_effect(&harness);
    assert!(logged.is_exception());
    assert_eq!(logged.created.len(), 1);
    assert_eq!(logged.sent.len(), 1);
    assert!(logged.update.is_none());

    assert_eq!(harness.phase(), TurnPhase::Idle);
}

#[test]
fn panicking_behavior_is_treated_as_an_exception() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let panicky = harness.create_actor(Behavior::new(PANICKY), Value::map());

    harness.send(&panicky, Value::Null);

    assert_eq!(harness.state_of(&panicky), Value::map());
    let faults = harness.turn_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].exception.kind, ExceptionKind::Behavior);
    assert_eq!(faults[0].exception.message, "panicky behavior");
}

#[test]
fn fault_in_one_actor_does_not_stop_others() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let panicky = harness.create_actor(Behavior::new(PANICKY), Value::map());
    let account = harness.create_actor(
        Behavior::new(ACCOUNT),
        [("balance", 42)].into_iter().collect::<Value>(),
    );
    let ok = Token::new("remote", "ok").unwrap();

    harness.send(&panicky, Value::Null);
    harness.send(&account, behaviors::adjust(-2, &ok, &ok));

    assert_eq!(harness.turn_faults().len(), 1);
    assert_eq!(behaviors::balance(&harness.state_of(&account)), 40);
    assert_eq!(harness.outbound().len(), 1);
}

#[test]
fn message_to_missing_actor_is_consumed_with_a_fault() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let nobody = Token::new("checkpoint", "nobody").unwrap();
    let recorder = harness.create_actor(Behavior::new(RECORDER), Value::Null);

    harness.send(&nobody, "hello");
    harness.send(&recorder, "still running");

    let faults = harness.turn_faults();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].token, nobody);
    assert_eq!(faults[0].exception.kind, ExceptionKind::UnknownActor);
    assert!(harness.pending_events().is_empty());
    assert_eq!(
        behaviors::recorded(&harness.state_of(&recorder)),
        vec![Value::from("still running")]
    );
}

#[test]
fn sequence_numbers_of_discarded_sends_are_not_reused() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let witness = harness.create_actor(Behavior::new(RECORDER), Value::Null);
    let faulty = harness.create_actor(
        Behavior::new(FAULTY),
        [("count", 0)].into_iter().collect::<Value>(),
    );

    harness.send(&faulty, faulty_request(true, &witness));
    let discarded = last_logged_effect(&harness).sent[0].seq;

    harness.send(&witness, "after");
    // The host send is the second to last effect, the recorder turn the last
    let lines = harness.store().log_lines();
    let host = Effect::from_json(&lines[lines.len() - 2]).unwrap();
    assert!(host.cause.is_none());
    assert!(host.sent[0].seq > discarded);
}

#[test]
fn turn_leaving_state_without_a_logged_form_is_aborted() {
    init_logging();
    let registry = behaviors::registry().with("diverge", |turn, _| {
        turn.state_mut().set("ratio", f64::INFINITY);
        Ok(())
    });
    let mut harness = RuntimeHarness::with_config(RuntimeConfig::default(), registry);
    let before: Value = [("ratio", 1.0)].into_iter().collect();
    let actor = harness.create_actor(Behavior::new("diverge"), before.clone());

    harness.send(&actor, Value::Null);

    assert_eq!(harness.state_of(&actor), before);
    assert_eq!(harness.turn_faults().len(), 1);
    assert_eq!(
        harness.turn_faults()[0].exception.kind,
        ExceptionKind::Behavior
    );
    assert!(harness.durability_failures().is_empty());
    assert_eq!(harness.phase(), TurnPhase::Idle);
}
