//! [`SnapshotEngine`]: the entry point for capture, restore and resize.

use log::{debug, warn};

use keel_container::{layout_hash, LayoutError, ResizeOutcome, SnapshotContainer};
use keel_core::{ContainerId, FieldDef, FrameId, GroupId, RecordBatch};

use crate::capture::{self, CaptureInput, CaptureStats};
use crate::config::{ConfigError, EngineConfig};
use crate::mutation::{MutationList, StructuralSink};
use crate::registry::ContainerRegistry;
use crate::request::{RequestKind, RequestQueue};
use crate::restore::{self, RestoreInput};
use crate::scheduler::WorkerPool;

/// The host's live records, as seen by [`SnapshotEngine::process_frame`].
///
/// Batches handed out for a container must belong to that container's
/// groups and carry local indices assigned against it.
pub trait LiveWorld: StructuralSink {
    /// Batches to capture into `container`, per group.
    fn capture_batches(&self, container: ContainerId) -> Vec<CaptureInput<'_>>;

    /// Batches to restore from `container`, per group.
    fn restore_batches(&mut self, container: ContainerId) -> Vec<RestoreInput<'_>>;
}

/// What [`SnapshotEngine::process_frame`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame the requests were processed for.
    pub frame: FrameId,
    /// Captured containers with their stats.
    pub captured: Vec<(ContainerId, CaptureStats)>,
    /// Restored containers with the number of mutations applied.
    pub restored: Vec<(ContainerId, usize)>,
    /// Requests dropped because the container was missing or invalid.
    pub dropped: usize,
}

/// Runs capture, restore and resize with a fixed configuration.
#[derive(Clone, Debug)]
pub struct SnapshotEngine {
    config: EngineConfig,
    pool: WorkerPool,
}

impl SnapshotEngine {
    /// Build an engine after validating `config`.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = WorkerPool::new(config.resolved_worker_count());
        Ok(Self { config, pool })
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Layout hash of one group's field list.
    pub fn layout_hash(fields: &[FieldDef]) -> u64 {
        layout_hash(fields)
    }

    /// Capture the batches of one group.
    ///
    /// # Panics
    ///
    /// See [`capture_groups`](Self::capture_groups).
    pub fn capture(
        &self,
        container: &mut SnapshotContainer,
        group: GroupId,
        batches: &[RecordBatch],
    ) -> CaptureStats {
        self.capture_groups(container, &[(group, batches)])
    }

    /// Capture the batches of several groups in one pass.
    ///
    /// # Panics
    ///
    /// Panics if a group is missing or listed twice, or a local index is
    /// out of range or used by two records of one group.
    pub fn capture_groups(
        &self,
        container: &mut SnapshotContainer,
        inputs: &[CaptureInput<'_>],
    ) -> CaptureStats {
        capture::capture(container, inputs, self.config.strategy, &self.pool)
    }

    /// Restore the batches of one group. The returned mutations must be
    /// applied before the records are used again.
    ///
    /// # Panics
    ///
    /// Panics if the group is missing or a local index is out of range.
    pub fn restore(
        &self,
        container: &SnapshotContainer,
        group: GroupId,
        batches: &mut [RecordBatch],
    ) -> MutationList {
        self.restore_groups(container, &mut [(group, batches)])
    }

    /// Restore the batches of several groups in one pass.
    pub fn restore_groups(
        &self,
        container: &SnapshotContainer,
        inputs: &mut [RestoreInput<'_>],
    ) -> MutationList {
        restore::restore(container, inputs, self.config.strategy, &self.pool)
    }

    /// Resize every group of `container` to `new_counts`, in place.
    ///
    /// Records whose local index is at or past the new count of a shrunk
    /// group no longer have slots and must be reassigned by the caller.
    ///
    /// # Panics
    ///
    /// Panics if `new_counts` does not hold one count per group.
    pub fn resize(
        &self,
        container: &mut SnapshotContainer,
        new_counts: &[u32],
    ) -> Result<ResizeOutcome, LayoutError> {
        container.resize(new_counts)
    }

    /// Drain `queue` and run every request against `registry` and `world`.
    ///
    /// Requests naming an unregistered container, and restores from a
    /// container that holds no valid data, are dropped with a warning.
    /// Each restore's mutations are applied to `world` before the next
    /// request runs.
    pub fn process_frame<W: LiveWorld + ?Sized>(
        &self,
        frame: FrameId,
        registry: &mut ContainerRegistry,
        queue: &mut RequestQueue,
        world: &mut W,
    ) -> FrameReport {
        let mut report = FrameReport {
            frame,
            ..FrameReport::default()
        };
        for request in queue.drain() {
            let id = request.container;
            let Some(container) = registry.get_mut(id) else {
                warn!(
                    "frame {frame}: dropping {} request, container {id} is not registered",
                    request.kind
                );
                report.dropped += 1;
                continue;
            };
            match request.kind {
                RequestKind::Capture => {
                    let inputs = world.capture_batches(id);
                    let stats = self.capture_groups(container, &inputs);
                    report.captured.push((id, stats));
                }
                RequestKind::Restore => {
                    if !container.is_valid() {
                        warn!(
                            "frame {frame}: dropping restore request, \
                             container {id} holds no valid snapshot"
                        );
                        report.dropped += 1;
                        continue;
                    }
                    let mutations = {
                        let mut inputs = world.restore_batches(id);
                        self.restore_groups(container, &mut inputs)
                    };
                    let applied = mutations.apply(world);
                    report.restored.push((id, applied));
                }
            }
        }
        debug!(
            "frame {frame}: {} captured, {} restored, {} dropped",
            report.captured.len(),
            report.restored.len(),
            report.dropped
        );
        report
    }
}

impl Default for SnapshotEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        let pool = WorkerPool::new(config.resolved_worker_count());
        Self { config, pool }
    }
}
