use turnstile_core::{Behavior, Output, Token, Value};
use turnstile_test_harness::{
    RuntimeHarness,
    behaviors::{self, ACCOUNT, INSUFFICIENT_FUNDS, TRANSFER},
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn remote(id: &str) -> Token {
    Token::new("remote", id).unwrap()
}

fn account(harness: &mut RuntimeHarness, balance: i64) -> Token {
    harness.create_actor(
        Behavior::new(ACCOUNT),
        [("balance", balance)].into_iter().collect::<Value>(),
    )
}

#[test]
fn withdrawal_within_balance_reports_new_balance() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let acct = account(&mut harness, 42);
    let (ok, fail) = (remote("ok"), remote("fail"));

    harness.send(&acct, behaviors::adjust(-13, &ok, &fail));

    assert_eq!(
        harness.outbound(),
        &[Output {
            address: ok,
            message: Value::from(29)
        }]
    );
    assert_eq!(behaviors::balance(&harness.state_of(&acct)), 29);
}

#[test]
fn overdraft_is_refused_and_balance_kept() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let acct = account(&mut harness, 10);
    let (ok, fail) = (remote("ok"), remote("fail"));

    harness.send(&acct, behaviors::adjust(-13, &ok, &fail));

    let expected: Value = [
        ("error", Value::from(INSUFFICIENT_FUNDS)),
        ("account", Value::from(&acct)),
    ]
    .into_iter()
    .collect();
    assert_eq!(
        harness.outbound(),
        &[Output {
            address: fail,
            message: expected
        }]
    );
    assert_eq!(behaviors::balance(&harness.state_of(&acct)), 10);
    // A refusal is a normal reply, not a fault
    assert!(harness.turn_faults().is_empty());
}

#[test]
fn balance_query_does_not_change_state() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let acct = account(&mut harness, 42);
    let (ok, fail) = (remote("ok"), remote("fail"));
    let before = harness.actor(&acct).unwrap();

    harness.send(&acct, behaviors::balance_query(&ok, &fail));

    assert_eq!(harness.outbound()[0].message, Value::from(42));
    assert_eq!(harness.actor(&acct).unwrap(), before);
}

#[test]
fn transfer_moves_funds_and_replies_once() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let src = account(&mut harness, 42);
    let dst = account(&mut harness, 0);
    let transfer = harness.create_actor(Behavior::new(TRANSFER), Value::Null);
    let (ok, fail) = (remote("ok"), remote("fail"));

    harness.send(
        &transfer,
        behaviors::transfer_request(&src, &dst, 13, &ok, &fail),
    );

    assert_eq!(
        harness.outbound(),
        &[Output {
            address: ok,
            message: Value::from(13)
        }]
    );
    assert_eq!(behaviors::balance(&harness.state_of(&src)), 29);
    assert_eq!(behaviors::balance(&harness.state_of(&dst)), 13);
}

#[test]
fn transfer_from_short_account_fails_without_moving_funds() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let src = account(&mut harness, 5);
    let dst = account(&mut harness, 0);
    let transfer = harness.create_actor(Behavior::new(TRANSFER), Value::Null);
    let (ok, fail) = (remote("ok"), remote("fail"));

    harness.send(
        &transfer,
        behaviors::transfer_request(&src, &dst, 13, &ok, &fail),
    );

    let outbound = harness.take_outbound();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].address, fail);
    assert_eq!(outbound[0].message.ref_field("account").unwrap(), &src);
    assert_eq!(behaviors::balance(&harness.state_of(&src)), 5);
    assert_eq!(behaviors::balance(&harness.state_of(&dst)), 0);
}

#[test]
fn failed_credit_reverses_the_debit() {
    init_logging();
    let mut harness = RuntimeHarness::new();
    let src = account(&mut harness, 42);
    // Crediting 13 still leaves this account overdrawn, so it refuses
    let dst = account(&mut harness, -20);
    let transfer = harness.create_actor(Behavior::new(TRANSFER), Value::Null);
    let (ok, fail) = (remote("ok"), remote("fail"));

    harness.send(
        &transfer,
        behaviors::transfer_request(&src, &dst, 13, &ok, &fail),
    );

    assert_eq!(
        harness.outbound(),
        &[Output {
            address: fail,
            message: Value::from(42)
        }]
    );
    assert_eq!(behaviors::balance(&harness.state_of(&src)), 42);
    assert_eq!(behaviors::balance(&harness.state_of(&dst)), -20);
}
