use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::{
    Behavior, BehaviorError, CheckpointError, Event, ExceptionKind, Token, TurnException,
    UnixTimestamp, Value,
};

use super::{address_space::Context, sponsor::Sponsor};

/// The view a behavior has of the world while it handles one message.
///
/// A behavior works on a copy of its actor. State changes and `become` only
/// take effect if the behavior returns `Ok`, messages sent and actors
/// created only once the turn's effect has been logged.
pub struct Turn<'a> {
    context: &'a mut Context,
    sponsor: Sponsor<'a>,
}

impl Turn<'_> {
    pub fn self_token(&self) -> &Token {
        &self.context.token
    }

    pub fn state(&self) -> &Value {
        &self.context.state
    }

    pub fn state_mut(&mut self) -> &mut Value {
        &mut self.context.state
    }

    /// The parameters captured by the current behavior.
    pub fn params(&self) -> &Value {
        &self.context.behavior.params
    }

    pub fn behavior(&self) -> &Behavior {
        &self.context.behavior
    }

    pub fn domain(&self) -> &str {
        self.sponsor.sequencer.domain()
    }

    pub fn now(&self) -> UnixTimestamp {
        self.sponsor.sequencer.now()
    }

    /// Replace this actor's behavior for every message after this one.
    pub fn become_behavior(&mut self, behavior: Behavior) -> Result<(), BehaviorError> {
        self.sponsor.registry.check(&behavior)?;
        self.context.behavior = behavior;
        Ok(())
    }

    pub fn create<V: Into<Value>>(
        &mut self,
        behavior: Behavior,
        state: V,
    ) -> Result<Token, BehaviorError> {
        Ok(self.sponsor.create(behavior, state.into(), None)?)
    }

    pub fn create_with_token<V: Into<Value>>(
        &mut self,
        token: Token,
        behavior: Behavior,
        state: V,
    ) -> Result<Token, BehaviorError> {
        Ok(self.sponsor.create(behavior, state.into(), Some(token))?)
    }

    pub fn send<V: Into<Value>>(&mut self, to: &Token, message: V) -> Result<(), BehaviorError> {
        Ok(self.sponsor.send(to.clone(), message.into())?)
    }
}

/// Run `event` against its actor, recording the outcome in the sponsor's
/// active effect.
///
/// The behavior runs against a copy of the context. On success the copy
/// becomes the effect's update. On failure, including a panic, the effect
/// records the exception and the live context is left as it was.
pub(crate) fn run_turn(event: &Event, sponsor: Sponsor<'_>) -> Result<(), CheckpointError> {
    let space = sponsor.space;
    let registry = sponsor.registry;
    let Some(context) = space.get(&event.token) else {
        return sponsor.effect.set_exception(TurnException::new(
            ExceptionKind::UnknownActor,
            CheckpointError::UnknownActor(event.token.clone()).to_string(),
        ));
    };
    let Some(behavior) = registry.get(&context.behavior.name).cloned() else {
        return sponsor.effect.set_exception(TurnException::new(
            ExceptionKind::UnknownBehavior,
            CheckpointError::UnknownBehavior(context.behavior.name.clone()).to_string(),
        ));
    };
    let mut working = context.clone();
    let mut turn = Turn {
        context: &mut working,
        sponsor,
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| behavior(&mut turn, &event.message)));
    let update = turn.context.memento();
    let Turn { sponsor, .. } = turn;
    match outcome {
        Ok(Ok(())) => match update.check_encodable() {
            Ok(()) => sponsor.effect.set_update(update),
            Err(e) => sponsor
                .effect
                .set_exception(TurnException::new(ExceptionKind::Behavior, e.to_string())),
        },
        Ok(Err(error)) => sponsor
            .effect
            .set_exception(TurnException::new(ExceptionKind::Behavior, error.to_string())),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "behavior panicked".to_string());
            sponsor
                .effect
                .set_exception(TurnException::new(ExceptionKind::Behavior, message))
        }
    }
}
