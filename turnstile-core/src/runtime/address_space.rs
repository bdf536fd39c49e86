use std::collections::{BTreeMap, HashMap};

use crate::{Behavior, Memento, Token, Value};

/// One live actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub token: Token,
    pub state: Value,
    pub behavior: Behavior,
}

impl Context {
    pub fn memento(&self) -> Memento {
        Memento {
            token: self.token.clone(),
            state: self.state.clone(),
            behavior: self.behavior.clone(),
        }
    }
}

impl From<Memento> for Context {
    fn from(m: Memento) -> Self {
        Context {
            token: m.token,
            state: m.state,
            behavior: m.behavior,
        }
    }
}

/// Every live actor, addressed by token.
///
/// Actors never hold each other directly, only tokens into this map, so
/// cyclic references need no special treatment.
#[derive(Debug, Default)]
pub(crate) struct AddressSpace {
    contexts: HashMap<Token, Context>,
}

impl AddressSpace {
    pub(crate) fn get(&self, token: &Token) -> Option<&Context> {
        self.contexts.get(token)
    }

    pub(crate) fn contains(&self, token: &Token) -> bool {
        self.contexts.contains_key(token)
    }

    pub(crate) fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Insert an actor which ignores every message, to be overwritten once
    /// every token in a snapshot exists.
    pub(crate) fn insert_placeholder(&mut self, token: Token) {
        self.contexts.insert(
            token.clone(),
            Context {
                token,
                state: Value::Null,
                behavior: Behavior::ignore(),
            },
        );
    }

    pub(crate) fn overwrite(&mut self, memento: &Memento) {
        self.contexts
            .insert(memento.token.clone(), Context::from(memento.clone()));
    }

    pub(crate) fn clear(&mut self) {
        self.contexts.clear();
    }

    pub(crate) fn mementos(&self) -> BTreeMap<Token, Memento> {
        self.contexts
            .iter()
            .map(|(token, ctx)| (token.clone(), ctx.memento()))
            .collect()
    }
}
