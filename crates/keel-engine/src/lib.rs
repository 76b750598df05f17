//! Capture and restore engine for Keel snapshot containers.
//!
//! [`SnapshotEngine`] copies live record batches into a
//! [`SnapshotContainer`](keel_container::SnapshotContainer) and back,
//! splitting the work into tasks according to the configured
//! [`SchedulingStrategy`] and running them on a scoped [`WorkerPool`].
//! Structural changes found during restore are returned as a
//! [`MutationList`] and applied afterwards through a [`StructuralSink`].
//!
//! [`ContainerRegistry`], [`RequestQueue`] and
//! [`SnapshotEngine::process_frame`] drive the engine once per frame
//! against a host [`LiveWorld`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod engine;
pub mod mutation;
pub mod registry;
pub mod request;
pub mod restore;
pub mod scheduler;

pub use capture::{CaptureInput, CaptureStats};
pub use config::{ConfigError, EngineConfig, SchedulingStrategy};
pub use engine::{FrameReport, LiveWorld, SnapshotEngine};
pub use mutation::{DeferredMutation, MutationBuffer, MutationList, StructuralSink};
pub use registry::ContainerRegistry;
pub use request::{Rejection, Request, RequestKind, RequestQueue};
pub use restore::RestoreInput;
pub use scheduler::WorkerPool;
