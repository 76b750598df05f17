//! Benchmark profiles for the Keel snapshot engine.
//!
//! Provides pre-built live worlds for benchmarking:
//!
//! - [`reference_profile`]: 4 groups of 2 500 records (10K records)
//! - [`stress_profile`]: 4 groups of 25 000 records (100K records)
//! - [`build_profile`]: any record count per group
//!
//! Records are partitioned into batches by field composition the way a
//! host runtime would, so some batches are large and some are tiny.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::BTreeMap;

use keel_container::{GroupSpec, SnapshotContainer};
use keel_core::{
    FieldColumn, FieldDef, FieldTypeId, GroupId, LocalIndex, RecordBatch, RecordHandle,
};
use keel_engine::{CaptureInput, RestoreInput};

/// Live batches for every group plus the specs to size a container.
#[derive(Clone, Debug)]
pub struct BenchProfile {
    /// One spec per group, in group order.
    pub specs: Vec<GroupSpec>,
    /// Live batches per group.
    pub groups: Vec<Vec<RecordBatch>>,
}

impl BenchProfile {
    /// A fresh container sized for this profile.
    pub fn container(&self) -> SnapshotContainer {
        SnapshotContainer::new(&self.specs)
            .unwrap_or_else(|e| panic!("benchmark layout rejected: {e}"))
    }

    /// Capture inputs for every group.
    pub fn capture_inputs(&self) -> Vec<CaptureInput<'_>> {
        self.groups
            .iter()
            .enumerate()
            .map(|(g, batches)| (GroupId(g as u32), batches.as_slice()))
            .collect()
    }

    /// Restore inputs for every group.
    pub fn restore_inputs(&mut self) -> Vec<RestoreInput<'_>> {
        self.groups
            .iter_mut()
            .enumerate()
            .map(|(g, batches)| (GroupId(g as u32), batches.as_mut_slice()))
            .collect()
    }

    /// Total number of live records.
    pub fn record_count(&self) -> usize {
        self.groups.iter().flatten().map(RecordBatch::len).sum()
    }

    /// Record count of each group.
    pub fn record_counts(&self) -> Vec<u32> {
        self.specs.iter().map(|s| s.record_count).collect()
    }
}

/// Field compositions of the four benchmark groups.
///
/// The first field of each group is always present; the rest drop out
/// for roughly one record in eight.
pub fn profile_groups() -> Vec<Vec<FieldDef>> {
    vec![
        vec![
            FieldDef::scalar("transform", FieldTypeId(0x100), 48),
            FieldDef::scalar("velocity", FieldTypeId(0x101), 12),
            FieldDef::scalar("frozen", FieldTypeId(0x102), 0),
        ],
        vec![
            FieldDef::scalar("health", FieldTypeId(0x200), 4),
            FieldDef::scalar("shield", FieldTypeId(0x201), 8).enableable(true),
            FieldDef::array("buffs", FieldTypeId(0x202), 6, 8).enableable(true),
        ],
        vec![
            FieldDef::scalar("owner", FieldTypeId(0x300), 8),
            FieldDef::array("inventory", FieldTypeId(0x301), 16, 32),
        ],
        vec![FieldDef::scalar("counter", FieldTypeId(0x400), 4)],
    ]
}

/// Build a reference benchmark profile: 4 groups of 2 500 records.
pub fn reference_profile(seed: u64) -> BenchProfile {
    build_profile(2_500, seed)
}

/// Build a stress benchmark profile: 4 groups of 25 000 records.
pub fn stress_profile(seed: u64) -> BenchProfile {
    build_profile(25_000, seed)
}

/// Build a profile with `records_per_group` records in every group.
///
/// Presence, array lengths and payload bytes are derived from `seed`, so
/// the same seed always yields the same profile.
pub fn build_profile(records_per_group: u32, seed: u64) -> BenchProfile {
    let groups = profile_groups();
    let mut next_handle = 0u64;
    let mut live = Vec::with_capacity(groups.len());
    for fields in &groups {
        let mut by_composition: BTreeMap<u64, RecordBatch> = BTreeMap::new();
        for local in 0..records_per_group {
            let handle = RecordHandle(next_handle);
            next_handle += 1;
            let h = mix(seed ^ handle.0);

            let mut mask = 1u64;
            for i in 1..fields.len() {
                if (h >> (i * 3)) & 7 != 0 {
                    mask |= 1u64 << i;
                }
            }
            let carried: Vec<&FieldDef> = fields
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1u64 << i) != 0)
                .map(|(_, def)| def)
                .collect();
            let values: Vec<(FieldTypeId, Vec<u8>, bool)> = carried
                .iter()
                .map(|def| (def.type_id, payload(def, h), !def.enableable || h & 1 == 0))
                .collect();
            let refs: Vec<(FieldTypeId, &[u8], bool)> = values
                .iter()
                .map(|(f, v, e)| (*f, v.as_slice(), *e))
                .collect();

            by_composition
                .entry(mask)
                .or_insert_with(|| {
                    RecordBatch::new(carried.iter().map(|d| (d.type_id, FieldColumn::for_def(d))))
                })
                .push(handle, LocalIndex(local), &refs);
        }
        live.push(by_composition.into_values().collect());
    }

    BenchProfile {
        specs: groups
            .into_iter()
            .map(|fields| GroupSpec::new(fields, records_per_group))
            .collect(),
        groups: live,
    }
}

fn payload(def: &FieldDef, h: u64) -> Vec<u8> {
    let elements = if def.is_array() {
        (h >> 32) as usize % (def.max_elements() as usize + 1)
    } else {
        1
    };
    let len = elements * def.element_size as usize;
    (0..len).map(|i| (h as u8).wrapping_add(i as u8)).collect()
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
