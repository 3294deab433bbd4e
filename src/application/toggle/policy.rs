use std::{fmt, sync::Arc};

use crate::domain::entities::PostRecord;

type PolicyFn = dyn Fn(Option<&PostRecord>) -> bool + Send + Sync;

/// Whether Markdown is on for posts that carry no explicit flag.
#[derive(Clone)]
pub enum DefaultPolicy {
    Fixed(bool),
    Custom(Arc<PolicyFn>),
}

impl DefaultPolicy {
    pub fn fixed(enabled: bool) -> Self {
        Self::Fixed(enabled)
    }

    pub fn custom<F>(policy: F) -> Self
    where
        F: Fn(Option<&PostRecord>) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(policy))
    }

    pub fn evaluate(&self, post: Option<&PostRecord>) -> bool {
        match self {
            DefaultPolicy::Fixed(enabled) => *enabled,
            DefaultPolicy::Custom(policy) => policy(post),
        }
    }
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::Fixed(false)
    }
}

impl fmt::Debug for DefaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultPolicy::Fixed(enabled) => f.debug_tuple("Fixed").field(enabled).finish(),
            DefaultPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
