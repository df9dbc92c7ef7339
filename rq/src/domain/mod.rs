//! Domain types shared across the scheduler

mod id;
mod priority;

pub use id::{IdGenerator, RequestId, SequentialIds, UuidIds};
pub use priority::Priority;
