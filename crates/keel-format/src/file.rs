//! Load and save snapshots on the local file system.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use keel_container::SnapshotContainer;
use keel_core::FrameId;
use log::{debug, warn};

use crate::error::FormatError;
use crate::reader::read_snapshot_into;
use crate::writer::write_snapshot;

/// Write `container` to `path`, replacing any existing file.
pub fn save_to_path(
    path: impl AsRef<Path>,
    frame: FrameId,
    container: &SnapshotContainer,
) -> Result<(), FormatError> {
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    write_snapshot(&mut w, frame, container)?;
    w.flush()?;
    debug!(
        "saved snapshot frame={frame} bytes={} to {}",
        container.len(),
        path.display()
    );
    Ok(())
}

/// Load a snapshot from `path` into `container`.
///
/// A missing file is an error here; see [`load_from_path_optional`]. Any
/// failure, including one to open the file, marks `container` invalid.
pub fn load_from_path(
    path: impl AsRef<Path>,
    container: &mut SnapshotContainer,
) -> Result<FrameId, FormatError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| open_failed(path, container, e))?;
    read_snapshot_into(&mut BufReader::new(file), container)
}

fn open_failed(path: &Path, container: &mut SnapshotContainer, e: io::Error) -> FormatError {
    container.invalidate();
    warn!("snapshot load rejected: cannot open {}: {e}", path.display());
    e.into()
}

/// Load a snapshot if `path` exists.
///
/// Returns `Ok(None)` with a warning when the file is missing, leaving
/// `container` untouched. Every other failure behaves like
/// [`load_from_path`].
pub fn load_from_path_optional(
    path: impl AsRef<Path>,
    container: &mut SnapshotContainer,
) -> Result<Option<FrameId>, FormatError> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("snapshot file {} not found, skipping load", path.display());
            return Ok(None);
        }
        Err(e) => return Err(open_failed(path, container, e)),
    };
    read_snapshot_into(&mut BufReader::new(file), container).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_container::GroupSpec;
    use keel_core::{FieldDef, FieldTypeId};
    use std::path::PathBuf;

    /// A per-process path in the temp dir, removed on drop.
    struct Scratch(PathBuf);

    impl Scratch {
        fn new(name: &str) -> Self {
            Self(std::env::temp_dir().join(format!(
                "keel-format-{}-{name}.snap",
                std::process::id()
            )))
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn container(count: u32) -> SnapshotContainer {
        SnapshotContainer::new(&[GroupSpec::new(
            vec![FieldDef::scalar("pos", FieldTypeId(7), 12)],
            count,
        )])
        .unwrap()
    }

    fn filled(count: u32) -> SnapshotContainer {
        let mut c = container(count);
        let pattern = vec![5u8; c.len()];
        let (hash, cap) = (c.snapshot_hash(), c.total_capacity());
        c.load_raw(hash, cap, &pattern).unwrap();
        c
    }

    #[test]
    fn save_then_load() {
        let path = Scratch::new("save-load");
        let source = filled(3);
        save_to_path(&path.0, FrameId(11), &source).unwrap();

        let mut target = container(3);
        assert_eq!(load_from_path(&path.0, &mut target).unwrap(), FrameId(11));
        assert_eq!(target.as_bytes(), source.as_bytes());
    }

    #[test]
    fn missing_file_is_soft() {
        let path = Scratch::new("does-not-exist");
        let mut target = container(2);
        assert_eq!(load_from_path_optional(&path.0, &mut target).unwrap(), None);
        assert!(!target.is_valid());
        assert!(matches!(
            load_from_path(&path.0, &mut target),
            Err(FormatError::Io(_))
        ));
    }

    #[test]
    fn open_failure_invalidates_loaded_container() {
        let path = Scratch::new("open-failure");
        let mut target = filled(2);
        assert!(target.is_valid());
        let before = target.as_bytes().to_vec();

        assert!(matches!(
            load_from_path(&path.0, &mut target),
            Err(FormatError::Io(_))
        ));
        assert!(!target.is_valid());
        assert_eq!(target.as_bytes(), before.as_slice());
    }

    #[test]
    fn optional_missing_file_keeps_validity() {
        let path = Scratch::new("optional-missing");
        let mut target = filled(2);
        assert_eq!(load_from_path_optional(&path.0, &mut target).unwrap(), None);
        assert!(target.is_valid());
    }

    #[test]
    fn optional_load_still_validates() {
        let path = Scratch::new("optional-mismatch");
        save_to_path(&path.0, FrameId(1), &container(4)).unwrap();
        let mut target = filled(2);
        let err = load_from_path_optional(&path.0, &mut target).unwrap_err();
        assert!(matches!(err, FormatError::Validation(_)));
        assert!(!target.is_valid());
    }
}
