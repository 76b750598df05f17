//! Containers owned by the host, addressed by [`ContainerId`].

use indexmap::IndexMap;

use keel_container::SnapshotContainer;
use keel_core::ContainerId;

/// Owns every snapshot container the engine may be asked to use.
#[derive(Debug, Default)]
pub struct ContainerRegistry {
    containers: IndexMap<ContainerId, SnapshotContainer>,
    next_id: u32,
}

impl ContainerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `container` and return its new id.
    pub fn register(&mut self, container: SnapshotContainer) -> ContainerId {
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        self.containers.insert(id, container);
        id
    }

    /// Remove and return a container.
    pub fn unregister(&mut self, id: ContainerId) -> Option<SnapshotContainer> {
        self.containers.shift_remove(&id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ContainerId) -> bool {
        self.containers.contains_key(&id)
    }

    /// The container with `id`, if registered.
    pub fn get(&self, id: ContainerId) -> Option<&SnapshotContainer> {
        self.containers.get(&id)
    }

    /// Mutable container with `id`, if registered.
    pub fn get_mut(&mut self, id: ContainerId) -> Option<&mut SnapshotContainer> {
        self.containers.get_mut(&id)
    }

    /// Number of registered containers.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether no container is registered.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Registered containers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ContainerId, &SnapshotContainer)> {
        self.containers.iter().map(|(&id, c)| (id, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_container::GroupSpec;
    use keel_core::{FieldDef, FieldTypeId};

    fn container(records: u32) -> SnapshotContainer {
        SnapshotContainer::new(&[GroupSpec::new(
            vec![FieldDef::scalar("a", FieldTypeId(1), 4)],
            records,
        )])
        .unwrap()
    }

    #[test]
    fn ids_are_never_reused() {
        let mut reg = ContainerRegistry::new();
        let a = reg.register(container(1));
        let b = reg.register(container(2));
        assert_ne!(a, b);
        assert!(reg.unregister(a).is_some());
        let c = reg.register(container(3));
        assert_ne!(c, a);
        assert_eq!(reg.len(), 2);
        assert!(!reg.contains(a));
    }

    #[test]
    fn lookup_and_iteration_order() {
        let mut reg = ContainerRegistry::new();
        let a = reg.register(container(1));
        let b = reg.register(container(2));
        assert_eq!(reg.get(b).unwrap().total_capacity(), 2);
        reg.get_mut(a).unwrap().mark_valid();
        let ids: Vec<_> = reg.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(reg.get(a).unwrap().is_valid());
        assert!(reg.get(ContainerId(99)).is_none());
    }
}
