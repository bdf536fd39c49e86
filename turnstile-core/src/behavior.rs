use std::{collections::HashMap, sync::Arc};

use crate::{CheckpointError, Value, runtime::Turn};

/// The name of an actor's behavior plus the parameters captured with it.
///
/// Behaviors are looked up by name in a [`BehaviorRegistry`] every time a
/// message is delivered, so a behavior survives a restart as long as the
/// restarted process registers the same name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Behavior {
    pub name: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

/// The behavior given to placeholder actors while a snapshot is restored.
pub const IGNORE: &str = "ignore";

impl Behavior {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            params: Value::Null,
        }
    }

    pub fn with_params<V: Into<Value>>(mut self, params: V) -> Self {
        self.params = params.into();
        self
    }

    pub fn ignore() -> Self {
        Self::new(IGNORE)
    }
}

/// A failure inside a behavior.
///
/// Returning one of these aborts the turn: the actor keeps its pre-turn
/// state and behavior and nothing the turn sent or created is released.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    #[error("{0}")]
    Fault(String),
    #[error("message has no field {0:?}")]
    MissingField(String),
    #[error("field {field:?} is not a {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Runtime(#[from] CheckpointError),
}

impl BehaviorError {
    pub fn fault<S: Into<String>>(msg: S) -> Self {
        BehaviorError::Fault(msg.into())
    }

    pub(crate) fn wrong_type(field: &str, expected: &'static str) -> Self {
        BehaviorError::WrongType {
            field: field.to_string(),
            expected,
        }
    }
}

pub type BehaviorFn = Arc<dyn Fn(&mut Turn<'_>, &Value) -> Result<(), BehaviorError> + Send + Sync>;

/// Maps behavior names to the functions which implement them.
#[derive(Clone)]
pub struct BehaviorRegistry {
    behaviors: HashMap<String, BehaviorFn>,
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorRegistry {
    /// A registry containing only the built in `ignore` behavior.
    pub fn new() -> Self {
        let mut registry = Self {
            behaviors: HashMap::new(),
        };
        registry.register(IGNORE, |_, _| Ok(()));
        registry
    }

    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Turn<'_>, &Value) -> Result<(), BehaviorError> + Send + Sync + 'static,
    {
        self.behaviors.insert(name.to_string(), Arc::new(f));
    }

    pub fn with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Turn<'_>, &Value) -> Result<(), BehaviorError> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&BehaviorFn> {
        self.behaviors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.behaviors.contains_key(name)
    }

    pub(crate) fn check(&self, behavior: &Behavior) -> Result<(), CheckpointError> {
        if self.contains(&behavior.name) {
            Ok(())
        } else {
            Err(CheckpointError::UnknownBehavior(behavior.name.clone()))
        }
    }
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = self.behaviors.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("BehaviorRegistry")
            .field("behaviors", &names)
            .finish()
    }
}
