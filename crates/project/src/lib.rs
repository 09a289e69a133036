//! On-disk form of an autosave checkpoint.
//!
//! A checkpoint holds exactly one document state: its tracks, selection, view
//! window and the description of the edit that produced it. Undo history is not
//! part of the artifact.

mod load;
mod save;

use daw_transport::{AudioArc, Clip, Track, TrackHandle, TrackId, WaveformData};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub use load::{CheckpointMetadata, load_checkpoint, load_checkpoint_metadata};
pub use save::{delete_checkpoint, write_checkpoint};

/// Bumped whenever the layout of [`CheckpointData`] changes incompatibly.
pub const CHECKPOINT_VERSION: u32 = 1;

const WAVEFORM_BUCKET: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    pub version: u32,
    pub short_description: String,
    pub long_description: String,
    /// Sample buffers, deduplicated: clips sharing audio point at the same entry.
    pub audio: Vec<AudioData>,
    pub tracks: Vec<TrackData>,
    pub selection: SelectionData,
    pub view: ViewData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioData {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackData {
    pub id: u64,
    pub name: String,
    pub clips: Vec<ClipData>,
    pub volume: f32,
    pub pan: f32,
    pub enabled: bool,
    pub solo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipData {
    pub name: String,
    pub start_tick: u64,
    pub end_tick: u64,
    pub audio_offset: u64,
    /// Index into [`CheckpointData::audio`].
    pub audio: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionData {
    pub start_tick: u64,
    pub end_tick: u64,
    pub tracks: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewData {
    pub start_tick: u64,
    pub end_tick: u64,
    pub vertical_scroll: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error(
        "Unsupported checkpoint version {found} in '{file}' (expected {expected})",
        file = .path.display(),
        expected = CHECKPOINT_VERSION
    )]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("Clip '{clip}' references missing audio entry {index}")]
    MissingAudio { clip: String, index: usize },
}

impl CheckpointData {
    pub fn from_tracks(
        short_description: &str,
        long_description: &str,
        tracks: &[TrackHandle],
        selection: SelectionData,
        view: ViewData,
    ) -> Self {
        let mut audio = Vec::new();
        let mut pool: HashMap<(*const f32, usize, u32, u16), usize> = HashMap::new();

        let tracks = tracks
            .iter()
            .map(|track| TrackData {
                id: track.id.0,
                name: track.name.clone(),
                clips: track
                    .clips()
                    .iter()
                    .map(|clip| {
                        let key = (
                            clip.audio.samples().as_ptr(),
                            clip.audio.len(),
                            clip.audio.sample_rate(),
                            clip.audio.channels(),
                        );
                        let index = *pool.entry(key).or_insert_with(|| {
                            audio.push(AudioData {
                                sample_rate: clip.audio.sample_rate(),
                                channels: clip.audio.channels(),
                                samples: clip.audio.samples().to_vec(),
                            });
                            audio.len() - 1
                        });
                        ClipData {
                            name: clip.name.clone(),
                            start_tick: clip.start_tick,
                            end_tick: clip.end_tick,
                            audio_offset: clip.audio_offset,
                            audio: index,
                        }
                    })
                    .collect(),
                volume: track.volume,
                pan: track.pan,
                enabled: track.enabled,
                solo: track.solo,
            })
            .collect();

        Self {
            version: CHECKPOINT_VERSION,
            short_description: short_description.to_string(),
            long_description: long_description.to_string(),
            audio,
            tracks,
            selection,
            view,
        }
    }

    /// Rebuild live tracks. Clips that shared audio before the write share it again.
    pub fn to_tracks(&self) -> Result<Vec<Track>, ProjectError> {
        let pool: Vec<(AudioArc, Arc<WaveformData>)> = self
            .audio
            .iter()
            .map(|data| {
                let audio = AudioArc::new(data.samples.clone(), data.sample_rate, data.channels);
                let waveform = Arc::new(WaveformData::from_audio_arc(&audio, WAVEFORM_BUCKET));
                (audio, waveform)
            })
            .collect();

        self.tracks
            .iter()
            .map(|track_data| {
                let mut track = Track::new(TrackId(track_data.id), track_data.name.clone());
                track.volume = track_data.volume;
                track.pan = track_data.pan;
                track.enabled = track_data.enabled;
                track.solo = track_data.solo;

                for clip_data in &track_data.clips {
                    let (audio, waveform) = pool.get(clip_data.audio).ok_or_else(|| {
                        ProjectError::MissingAudio {
                            clip: clip_data.name.clone(),
                            index: clip_data.audio,
                        }
                    })?;
                    track.insert_clip(Clip {
                        start_tick: clip_data.start_tick,
                        end_tick: clip_data.end_tick,
                        audio: audio.clone(),
                        waveform: waveform.clone(),
                        audio_offset: clip_data.audio_offset,
                        name: clip_data.name.clone(),
                    });
                }
                Ok(track)
            })
            .collect()
    }

    pub fn clip_count(&self) -> usize {
        self.tracks.iter().map(|t| t.clips.len()).sum()
    }
}
