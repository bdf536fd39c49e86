use std::num::NonZeroU64;

/// What the runtime does when the log refuses an effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilityPolicy {
    /// Report the failure and dispatch nothing further until the host calls
    /// `resume`, which retries the write that failed.
    #[default]
    Halt,
    /// Report the failure and stop the runtime.
    Abort,
}

/// Configuration for a [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// The name of the local address space.
    pub domain: String,
    pub durability_policy: DurabilityPolicy,
    /// Take a snapshot after this many effects have been committed.
    pub snapshot_every: Option<NonZeroU64>,
}

pub const DEFAULT_DOMAIN: &str = "checkpoint";

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            durability_policy: DurabilityPolicy::default(),
            snapshot_every: None,
        }
    }
}

impl RuntimeConfig {
    pub fn with_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_durability_policy(mut self, policy: DurabilityPolicy) -> Self {
        self.durability_policy = policy;
        self
    }

    pub fn with_snapshot_every(mut self, commits: u64) -> Self {
        self.snapshot_every = NonZeroU64::new(commits);
        self
    }

    /// # Panics
    ///
    /// If the domain is not a valid token domain.
    pub(crate) fn validate(&self) {
        assert!(
            crate::token::is_valid_domain(&self.domain),
            "invalid domain name {:?}",
            self.domain
        );
    }
}
