use turnstile_core::{BehaviorError, BehaviorRegistry, RuntimeConfig, Turn, Value};

use crate::{
    LoadError, Turnstile,
    runtime::RuntimeHandle,
    storage::{InMemoryStorage, Storage},
    transport::{DiscardTransport, Transport},
};

pub struct TurnstileBuilder<S, R, T> {
    pub(crate) storage: S,
    pub(crate) runtime: R,
    pub(crate) transport: T,
    pub(crate) config: RuntimeConfig,
    pub(crate) registry: BehaviorRegistry,
}

impl<S, R, T> TurnstileBuilder<S, R, T> {
    pub fn with_storage<S2: Storage>(self, storage: S2) -> TurnstileBuilder<S2, R, T> {
        TurnstileBuilder {
            storage,
            runtime: self.runtime,
            transport: self.transport,
            config: self.config,
            registry: self.registry,
        }
    }

    pub fn with_runtime<R2: RuntimeHandle>(self, runtime: R2) -> TurnstileBuilder<S, R2, T> {
        TurnstileBuilder {
            runtime,
            storage: self.storage,
            transport: self.transport,
            config: self.config,
            registry: self.registry,
        }
    }

    pub fn with_transport<T2: Transport>(self, transport: T2) -> TurnstileBuilder<S, R, T2> {
        TurnstileBuilder {
            transport,
            storage: self.storage,
            runtime: self.runtime,
            config: self.config,
            registry: self.registry,
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the registry. Every behavior named in storage must be
    /// registered or loading fails.
    pub fn with_registry(mut self, registry: BehaviorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_behavior<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Turn<'_>, &Value) -> Result<(), BehaviorError> + Send + Sync + 'static,
    {
        self.registry.register(name, f);
        self
    }
}

impl<R> TurnstileBuilder<InMemoryStorage, R, DiscardTransport> {
    pub fn new(runtime: R) -> TurnstileBuilder<InMemoryStorage, R, DiscardTransport> {
        TurnstileBuilder {
            storage: InMemoryStorage::new(),
            runtime,
            transport: DiscardTransport,
            config: RuntimeConfig::default(),
            registry: BehaviorRegistry::new(),
        }
    }
}

impl<S: Storage, R: RuntimeHandle, T: Transport> TurnstileBuilder<S, R, T> {
    pub async fn load(self) -> Result<Turnstile, LoadError> {
        Turnstile::load(self).await
    }
}
