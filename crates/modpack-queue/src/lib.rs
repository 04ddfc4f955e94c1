//! Modpack Queue - the serial task queue of the modpack addon operator
//!
//! Every operation the operator performs (running a module, deleting a
//! module, running a single hook) is enqueued as a [`Task`] and executed by
//! exactly one consumer, in insertion order. A failing task without
//! allow-failure stays at the head and is retried, so operations are never
//! reordered around a failure.

pub mod queue;
pub mod task;

pub use queue::TasksQueue;
pub use task::{Task, TaskKind};
