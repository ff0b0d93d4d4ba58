// src/gateway/mod.rs

//! Command Gateway: the request/response boundary to the process service.
//!
//! - [`service`] defines the [`ProcessService`] trait the execution backend
//!   implements, plus its request and result types. Tests swap in a fake.
//! - [`command`] wraps a service with the optimistic registry updates and
//!   rollback rules each command needs, and converts every failure into a
//!   typed [`SyncError`](crate::errors::SyncError).

pub mod command;
pub mod service;

pub use command::CommandGateway;
pub use service::{CommandResult, LaunchSpec, ProcessService, ServiceFuture};
