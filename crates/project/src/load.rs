use crate::{CHECKPOINT_VERSION, CheckpointData, ProjectError};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Summary shown when offering to recover a checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointMetadata {
    pub short_description: String,
    pub long_description: String,
    pub track_count: usize,
    pub clip_count: usize,
}

pub fn load_checkpoint(path: &Path) -> Result<CheckpointData, ProjectError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let data: CheckpointData = rmp_serde::decode::from_read(reader)?;

    if data.version != CHECKPOINT_VERSION {
        return Err(ProjectError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: data.version,
        });
    }

    Ok(data)
}

pub fn load_checkpoint_metadata(path: &Path) -> Result<CheckpointMetadata, ProjectError> {
    let data = load_checkpoint(path)?;

    Ok(CheckpointMetadata {
        track_count: data.tracks.len(),
        clip_count: data.clip_count(),
        short_description: data.short_description,
        long_description: data.long_description,
    })
}
