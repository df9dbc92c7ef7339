//! Request identity
//!
//! Ids are handed out by an injected [`IdGenerator`] so tests can assert
//! deterministic identity and ordering. The default is a per-scheduler
//! monotonic counter; [`UuidIds`] gives globally unique, time-ordered ids.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque request identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Get the full ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Source of request ids
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> RequestId;
}

/// Monotonic counter ids: `req-1`, `req-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> RequestId {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        RequestId(format!("req-{}", n))
    }
}

/// UUID v7 ids (time-ordered)
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> RequestId {
        RequestId(uuid::Uuid::now_v7().to_string())
    }
}
