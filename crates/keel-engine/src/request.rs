//! Per-frame queue of capture and restore requests.
//!
//! At most one request per container is accepted per frame. A second
//! request of the same kind is a duplicate; a request of the other kind
//! contradicts the first. Both are dropped with a warning and the first
//! request stands.

use std::fmt;

use log::warn;

use keel_core::ContainerId;

/// What to do with a container this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Copy live records into the container.
    Capture,
    /// Copy the container back onto live records.
    Restore,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture => write!(f, "capture"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// One accepted request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request {
    /// Target container.
    pub container: ContainerId,
    /// Operation to run.
    pub kind: RequestKind,
}

/// Why a request was not queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The same request is already queued this frame.
    Duplicate,
    /// A request of the other kind is already queued for the container.
    Contradictory {
        /// The kind that was queued first and stands.
        queued: RequestKind,
    },
}

/// Requests collected for the next frame, in submission order.
#[derive(Clone, Debug, Default)]
pub struct RequestQueue {
    pending: Vec<Request>,
}

impl RequestQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a capture of `container`.
    pub fn request_capture(&mut self, container: ContainerId) -> Result<(), Rejection> {
        self.submit(container, RequestKind::Capture)
    }

    /// Queue a restore from `container`.
    pub fn request_restore(&mut self, container: ContainerId) -> Result<(), Rejection> {
        self.submit(container, RequestKind::Restore)
    }

    /// Queue a request, dropping it with a warning if the container
    /// already has one this frame.
    pub fn submit(&mut self, container: ContainerId, kind: RequestKind) -> Result<(), Rejection> {
        if let Some(queued) = self.pending.iter().find(|r| r.container == container) {
            let rejection = if queued.kind == kind {
                warn!("dropping duplicate {kind} request for container {container}");
                Rejection::Duplicate
            } else {
                warn!(
                    "dropping {kind} request for container {container}: \
                     contradicts queued {} request",
                    queued.kind
                );
                Rejection::Contradictory {
                    queued: queued.kind,
                }
            };
            return Err(rejection);
        }
        self.pending.push(Request { container, kind });
        Ok(())
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queued requests in submission order.
    pub fn pending(&self) -> &[Request] {
        &self.pending
    }

    /// Take every queued request, leaving the queue empty for the next frame.
    pub fn drain(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.pending)
    }
}
