//! Core allocation abstractions: resources, clients, the reservation pool,
//! policy modules and the allocator task pipeline.

pub mod allocator;
pub mod audit;
pub mod client;
pub mod error;
pub mod executor;
pub mod module;
pub mod modules;
pub mod pending;
pub mod reservation_pool;
pub mod resource;
pub mod scheduler;

pub use allocator::{AllocatorCommand, AllocatorTask};
pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink};
pub use client::{Client, ClientId, DummyClient, SharedClient};
pub use error::{AppResult, SchedulerError};
pub use executor::{Job, TaskExecutor, TaskHandle, TaskState};
pub use module::{AllocationAdvisor, Module, SharedModule};
pub use modules::block::{Block, BlockModule};
pub use pending::PendingAllocationManager;
pub use reservation_pool::{ReservationEntry, ReservationPool};
pub use resource::{resource_set, Resource, ResourceSet};
pub use scheduler::Scheduler;
