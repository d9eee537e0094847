//! # Fleet Scheduler
//!
//! Resource scheduler for fleets of automated guided vehicles.
//!
//! Vehicles share a plant layout of points and path segments. This crate
//! grants, tracks and revokes exclusive access to those resources so that
//! independently moving vehicles never collide and never deadlock.
//!
//! ## Protocol
//!
//! - A client (vehicle controller) **claims** the ordered sequence of resource
//!   sets it will need, e.g. the successive steps of its route.
//! - It then **allocates** the set at the head of its claim. The request is
//!   handled asynchronously: if the resources are free and every policy
//!   module agrees, the client's `on_allocation` callback fires; otherwise the
//!   request is deferred until something changes.
//! - Releasing resources (**free** / **free_all**) triggers a retry sweep over
//!   all deferred requests.
//!
//! Contention never surfaces as an error. A request that cannot be granted
//! yet simply has not called back yet. Errors are reserved for protocol
//! misuse (allocating a set that is not next in the claim) and for the
//! immediate `allocate_now` path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fleet_scheduler::core::{resource_set, Scheduler, SharedClient};
//! use fleet_scheduler::runtime::ThreadPoolExecutor;
//!
//! let scheduler = Scheduler::new(Arc::new(ThreadPoolExecutor::new(4)?), Vec::new());
//! scheduler.initialize();
//!
//! let vehicle: SharedClient = Arc::new(my_vehicle_controller);
//! scheduler.claim(&vehicle, vec![resource_set(["P1"]), resource_set(["P1--P2", "P2"])])?;
//! scheduler.allocate(&vehicle, resource_set(["P1"]))?;
//! // ... `on_allocation` is called once P1 is granted ...
//! scheduler.free(&vehicle, &resource_set(["P1"]))?;
//! ```
//!
//! ## Policy modules
//!
//! Implement [`core::Module`] to veto allocations, delay them until some
//! external preparation finished, or observe allocation state. The built-in
//! [`core::BlockModule`] keeps single-vehicle blocks exclusive.
//!
//! For complete scenarios, see `tests/scheduler_scenarios_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core allocation abstractions and the scheduler facade.
pub mod core;
/// Configuration models for the scheduler, executor and blocks.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Task executor adapters (Tokio, worker threads, manual).
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::core::{
    resource_set, Client, ClientId, Module, Resource, ResourceSet, Scheduler, SchedulerError,
};
