//! Example behaviors used to exercise the runtime.
use turnstile_core::{Behavior, BehaviorError, BehaviorRegistry, Token, Turn, Value};

pub const ACCOUNT: &str = "account";
pub const TRANSFER: &str = "transfer";
pub const DEBIT: &str = "transfer.debit";
pub const CREDIT: &str = "transfer.credit";
pub const REVERSE: &str = "transfer.reverse";
pub const RECORDER: &str = "recorder";
pub const PING: &str = "ping";
pub const PONG: &str = "pong";
pub const RING_SEED: &str = "ring.seed";
pub const RING_NODE: &str = "ring.node";
pub const ONE_TIME: &str = "one_time";
pub const FAULTY: &str = "faulty";
pub const PANICKY: &str = "panicky";
pub const BURST: &str = "burst";

pub const INSUFFICIENT_FUNDS: &str = "Insufficient Funds";

/// A registry containing every behavior in this module.
pub fn registry() -> BehaviorRegistry {
    BehaviorRegistry::new()
        .with(ACCOUNT, account)
        .with(TRANSFER, transfer)
        .with(DEBIT, debit)
        .with(CREDIT, credit)
        .with(REVERSE, reverse)
        .with(RECORDER, recorder)
        .with(PING, ping)
        .with(PONG, pong)
        .with(RING_SEED, ring_seed)
        .with(RING_NODE, ring_node)
        .with(ONE_TIME, one_time)
        .with(FAULTY, faulty)
        .with(PANICKY, panicky)
        .with(BURST, burst)
}

/// `{amount, ok, fail}` for an account.
pub fn adjust(amount: i64, ok: &Token, fail: &Token) -> Value {
    [
        ("amount", Value::from(amount)),
        ("ok", Value::from(ok)),
        ("fail", Value::from(fail)),
    ]
    .into_iter()
    .collect()
}

/// `{type: "balance", ok, fail}` for an account.
pub fn balance_query(ok: &Token, fail: &Token) -> Value {
    [
        ("type", Value::from("balance")),
        ("ok", Value::from(ok)),
        ("fail", Value::from(fail)),
    ]
    .into_iter()
    .collect()
}

/// `{from, to, amount, ok, fail}` for a transfer.
pub fn transfer_request(from: &Token, to: &Token, amount: i64, ok: &Token, fail: &Token) -> Value {
    [
        ("from", Value::from(from)),
        ("to", Value::from(to)),
        ("amount", Value::from(amount)),
        ("ok", Value::from(ok)),
        ("fail", Value::from(fail)),
    ]
    .into_iter()
    .collect()
}

pub fn balance(state: &Value) -> i64 {
    state.int_field("balance").expect("account state has a balance")
}

/// Everything a recorder has received, oldest first.
pub fn recorded(state: &Value) -> Vec<Value> {
    state
        .get("received")
        .and_then(Value::as_list)
        .map(<[Value]>::to_vec)
        .unwrap_or_default()
}

// state: {balance}
// message: {type: "balance", ok, fail} or {amount, ok, fail}
fn account(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let balance = turn.state().int_field("balance")?;
    let ok = msg.ref_field("ok")?.clone();
    if msg.get("type").and_then(Value::as_str) == Some("balance") {
        return turn.send(&ok, balance);
    }
    let fail = msg.ref_field("fail")?.clone();
    let updated = balance + msg.int_field("amount")?;
    if updated >= 0 {
        turn.state_mut().set("balance", updated);
        turn.send(&ok, updated)
    } else {
        let account = turn.self_token().clone();
        let reply: Value = [
            ("error", Value::from(INSUFFICIENT_FUNDS)),
            ("account", Value::from(account)),
        ]
        .into_iter()
        .collect();
        turn.send(&fail, reply)
    }
}

// Creates a debit actor holding the request and kicks it off.
fn transfer(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let debit = turn.create(Behavior::new(DEBIT), msg.clone())?;
    turn.send(&debit, Value::Null)
}

// Take the amount from the source account, continuing as the credit step.
fn debit(turn: &mut Turn<'_>, _msg: &Value) -> Result<(), BehaviorError> {
    let from = turn.state().ref_field("from")?.clone();
    let amount = turn.state().int_field("amount")?;
    let fail = turn.state().ref_field("fail")?.clone();
    let me = turn.self_token().clone();
    turn.send(&from, adjust(-amount, &me, &fail))?;
    turn.become_behavior(Behavior::new(CREDIT))
}

// The source was debited, credit the destination. If that fails the debit
// is reversed.
fn credit(turn: &mut Turn<'_>, _msg: &Value) -> Result<(), BehaviorError> {
    let to = turn.state().ref_field("to")?.clone();
    let amount = turn.state().int_field("amount")?;
    let ok = turn.state().ref_field("ok")?.clone();
    let me = turn.self_token().clone();
    turn.send(&to, adjust(amount, &ok, &me))?;
    turn.become_behavior(Behavior::new(REVERSE))
}

fn reverse(turn: &mut Turn<'_>, _msg: &Value) -> Result<(), BehaviorError> {
    let from = turn.state().ref_field("from")?.clone();
    let amount = turn.state().int_field("amount")?;
    let fail = turn.state().ref_field("fail")?.clone();
    turn.send(&from, adjust(amount, &fail, &fail))
}

fn recorder(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let mut received = recorded(turn.state());
    received.push(msg.clone());
    turn.state_mut().set("received", received);
    Ok(())
}

// state: {peer, pings}
// message: remaining round trips
fn ping(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let remaining = msg
        .as_int()
        .ok_or_else(|| BehaviorError::fault("ping expects a count"))?;
    let peer = turn.state().ref_field("peer")?.clone();
    let pings = turn.state().int_field("pings")?;
    turn.state_mut().set("pings", pings + 1);
    turn.send(&peer, remaining)
}

// state: {peer, done, pongs}
fn pong(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let remaining = msg
        .as_int()
        .ok_or_else(|| BehaviorError::fault("pong expects a count"))?;
    let pongs = turn.state().int_field("pongs")?;
    turn.state_mut().set("pongs", pongs + 1);
    if remaining > 1 {
        let peer = turn.state().ref_field("peer")?.clone();
        turn.send(&peer, remaining - 1)
    } else {
        let done = turn.state().ref_field("done")?.clone();
        turn.send(&done, "pong")
    }
}

// message: {size, hops, report}
// Creates `size` ring nodes, each pointing at the next, and starts a token
// of `hops` hops around them.
fn ring_seed(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let size = msg.int_field("size")?;
    let hops = msg.int_field("hops")?;
    let report = msg.ref_field("report")?.clone();
    if size < 1 {
        return Err(BehaviorError::fault("a ring needs at least one node"));
    }
    let mut next = turn.self_token().clone();
    for _ in 0..size {
        let state: Value = [
            ("next", Value::from(&next)),
            ("report", Value::from(&report)),
            ("seen", Value::from(0)),
        ]
        .into_iter()
        .collect();
        next = turn.create(Behavior::new(RING_NODE), state)?;
    }
    // close the ring: this actor becomes a node pointing at the last created
    let state: Value = [
        ("next", Value::from(&next)),
        ("report", Value::from(&report)),
        ("seen", Value::from(0)),
    ]
    .into_iter()
    .collect();
    *turn.state_mut() = state;
    turn.become_behavior(Behavior::new(RING_NODE))?;
    turn.send(&next, hops)
}

fn ring_node(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let remaining = msg
        .as_int()
        .ok_or_else(|| BehaviorError::fault("ring expects a hop count"))?;
    let seen = turn.state().int_field("seen")?;
    turn.state_mut().set("seen", seen + 1);
    if remaining > 0 {
        let next = turn.state().ref_field("next")?.clone();
        turn.send(&next, remaining - 1)
    } else {
        let report = turn.state().ref_field("report")?.clone();
        let me = turn.self_token().clone();
        turn.send(&report, me)
    }
}

// Creates a recorder, tells it its label and then ignores everything.
fn one_time(turn: &mut Turn<'_>, _msg: &Value) -> Result<(), BehaviorError> {
    let label = turn.state().field("label")?.clone();
    let actor = turn.create(Behavior::new(RECORDER), Value::Null)?;
    turn.send(&actor, label)?;
    turn.become_behavior(Behavior::ignore())
}

// message: {fail: bool, witness}
// Mutates its state, creates an actor, sends to the witness and becomes a
// recorder before deciding whether to fail.
fn faulty(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let witness = msg.ref_field("witness")?.clone();
    let count = turn.state().int_field("count")?;
    turn.state_mut().set("count", count + 1);
    let child = turn.create(Behavior::new(RECORDER), Value::Null)?;
    turn.send(&witness, child)?;
    turn.become_behavior(Behavior::new(RECORDER))?;
    if msg.get("fail").and_then(Value::as_bool) == Some(true) {
        return Err(BehaviorError::fault("asked to fail"));
    }
    Ok(())
}

fn panicky(turn: &mut Turn<'_>, _msg: &Value) -> Result<(), BehaviorError> {
    turn.state_mut().set("touched", true);
    panic!("panicky behavior");
}

// message: {to, count}
// Sends 0..count to `to` in one turn.
fn burst(turn: &mut Turn<'_>, msg: &Value) -> Result<(), BehaviorError> {
    let to = msg.ref_field("to")?.clone();
    for i in 0..msg.int_field("count")? {
        turn.send(&to, i)?;
    }
    Ok(())
}
