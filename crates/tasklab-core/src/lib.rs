//! tasklab-core library.
//!
//! An in-memory work item tracker built around a declarative field
//! validation engine.
//!
//! - [`validate`]: per-kind rule tables and the engine that runs them.
//! - [`model`]: the work item entity, its payloads and serialized record.
//! - [`service`]: the [`TaskService`](service::TaskService) trait and its
//!   Vec-backed repository.
//! - [`controller`]: a front that captures service errors for later review.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::TaskError`]; config
//!   loading uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod service;
pub mod validate;

pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{ErrorWithContext, TaskController};
pub use error::{ErrorCode, FieldViolation, Lookup, TaskError};
pub use model::{CreatePayload, UpdatePayload, WorkItem, WorkItemKind, WorkItemRecord};
pub use service::{TaskRepository, TaskService};
pub use validate::Field;
