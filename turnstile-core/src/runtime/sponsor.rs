use rand::rngs::StdRng;

use crate::{
    Behavior, BehaviorRegistry, CheckpointError, Effect, EffectAccumulator, Memento, Output, Token,
    Value,
};

use super::{AddressSpace, sequencer::Sequencer};

/// The capability to create actors and send messages.
///
/// Everything a sponsor does is recorded in the active effect of its
/// accumulator. Nothing is visible in the address space or the queue until
/// that effect is committed.
pub(crate) struct Sponsor<'a> {
    pub(crate) effect: &'a mut EffectAccumulator,
    pub(crate) sequencer: &'a mut Sequencer,
    pub(crate) rng: &'a mut StdRng,
    pub(crate) registry: &'a BehaviorRegistry,
    pub(crate) space: &'a AddressSpace,
    /// An effect the log refused, still waiting to be committed.
    pub(crate) stalled: Option<&'a Effect>,
}

impl Sponsor<'_> {
    pub(crate) fn create(
        &mut self,
        behavior: Behavior,
        state: Value,
        token: Option<Token>,
    ) -> Result<Token, CheckpointError> {
        self.registry.check(&behavior)?;
        let domain = self.sequencer.domain().to_string();
        let token = match token {
            Some(token) => {
                if !token.is_local_to(&domain) {
                    return Err(CheckpointError::ForeignToken { token, domain });
                }
                let pending = self
                    .effect
                    .active()
                    .into_iter()
                    .chain(self.stalled)
                    .any(|e| e.created.contains_key(&token));
                if pending || self.space.contains(&token) {
                    return Err(CheckpointError::DuplicateActor(token));
                }
                token
            }
            None => Token::generate(&mut *self.rng, &domain),
        };
        let memento = Memento {
            token: token.clone(),
            state,
            behavior,
        };
        memento.check_encodable()?;
        self.effect.add_context(memento)?;
        Ok(token)
    }

    pub(crate) fn send(&mut self, token: Token, message: Value) -> Result<(), CheckpointError> {
        if !self.effect.is_active() {
            return Err(CheckpointError::NoActiveEffect);
        }
        if !message.is_encodable() {
            return Err(CheckpointError::Unencodable(format!("message for {token}")));
        }
        if token.is_local_to(self.sequencer.domain()) {
            let event = self.sequencer.stamp(token, message);
            self.effect.add_event(event)
        } else {
            self.effect.add_output(Output {
                address: token,
                message,
            })
        }
    }
}
