use crate::{CheckpointData, ProjectError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a checkpoint as MessagePack.
///
/// The bytes go to a sibling `.tmp` file that is renamed over `path` once fully
/// flushed, so a crash mid-write leaves the previous checkpoint intact.
pub fn write_checkpoint(path: &Path, data: &CheckpointData) -> Result<(), ProjectError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        rmp_serde::encode::write_named(&mut writer, data)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    tracing::debug!(path = %path.display(), tracks = data.tracks.len(), "checkpoint written");
    Ok(())
}

/// Remove the checkpoint at `path`. A missing file is not an error.
pub fn delete_checkpoint(path: &Path) -> Result<(), ProjectError> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "checkpoint deleted");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SelectionData, ViewData};
    use daw_transport::{Track, TrackId};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn empty_checkpoint() -> CheckpointData {
        CheckpointData::from_tracks(
            "Add Track",
            "Added track",
            &[Arc::new(Track::new(TrackId(1), "Audio 1".to_string()))],
            SelectionData::default(),
            ViewData::default(),
        )
    }

    #[test]
    fn test_write_checkpoint_creates_file_and_parents() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("doc.autosave");

        write_checkpoint(&path, &empty_checkpoint()).expect("write");

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_write_checkpoint_replaces_previous() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.autosave");

        write_checkpoint(&path, &empty_checkpoint()).expect("first write");
        let mut second = empty_checkpoint();
        second.short_description = "Rename".to_string();
        write_checkpoint(&path, &second).expect("second write");

        let loaded = crate::load_checkpoint(&path).expect("load");
        assert_eq!(loaded.short_description, "Rename");
    }

    #[test]
    fn test_delete_checkpoint_missing_file_is_ok() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("never-written.autosave");

        delete_checkpoint(&path).expect("delete");
    }

    #[test]
    fn test_delete_checkpoint_removes_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.autosave");
        write_checkpoint(&path, &empty_checkpoint()).expect("write");

        delete_checkpoint(&path).expect("delete");

        assert!(!path.exists());
    }
}
