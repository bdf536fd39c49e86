use crate::{CheckpointError, Event, Memento};

use super::{Effect, Output, TurnException};

/// Holds the single effect that is currently being built.
#[derive(Debug, Default)]
pub struct EffectAccumulator {
    active: Option<Effect>,
}

impl EffectAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, cause: Option<Event>) -> Result<(), CheckpointError> {
        if self.active.is_some() {
            return Err(CheckpointError::EffectAlreadyActive);
        }
        self.active = Some(Effect::caused_by(cause));
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&Effect> {
        self.active.as_ref()
    }

    fn active_mut(&mut self) -> Result<&mut Effect, CheckpointError> {
        self.active.as_mut().ok_or(CheckpointError::NoActiveEffect)
    }

    pub fn add_context(&mut self, memento: Memento) -> Result<(), CheckpointError> {
        self.active_mut()?
            .created
            .insert(memento.token.clone(), memento);
        Ok(())
    }

    pub fn add_event(&mut self, event: Event) -> Result<(), CheckpointError> {
        self.active_mut()?.sent.push(event);
        Ok(())
    }

    pub fn add_output(&mut self, output: Output) -> Result<(), CheckpointError> {
        self.active_mut()?.output.push(output);
        Ok(())
    }

    pub fn set_update(&mut self, memento: Memento) -> Result<(), CheckpointError> {
        self.active_mut()?.update = Some(memento);
        Ok(())
    }

    pub fn set_exception(&mut self, exception: TurnException) -> Result<(), CheckpointError> {
        self.active_mut()?.exception = Some(exception);
        Ok(())
    }

    pub fn finish(&mut self) -> Result<Effect, CheckpointError> {
        self.active.take().ok_or(CheckpointError::NoActiveEffect)
    }
}
