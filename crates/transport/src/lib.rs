use std::sync::Arc;

/// Pulses Per Quarter Note - defines timing resolution
pub const PPQN: u64 = 960;

/// Shared, immutable audio sample data.
///
/// Cloning only bumps the reference count of the sample slice, so a clip can be
/// copied into any number of tracks and history snapshots without duplicating
/// the samples themselves.
///
/// ```
/// use daw_transport::AudioArc;
///
/// let audio = AudioArc::new(vec![0.0, 0.5, 1.0, 0.5], 44100, 2);
/// let shared = audio.clone();
/// assert_eq!(shared.frames(), 2);
/// assert!(audio.shares_samples_with(&shared));
/// ```
#[derive(Clone)]
pub struct AudioArc {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioArc {
    /// Create a new `AudioArc` from interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is 0 or if `samples.len()` is not divisible by `channels`.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self::from_arc(Arc::from(samples), sample_rate, channels)
    }

    /// Wrap an existing `Arc<[f32]>` without copying.
    ///
    /// # Panics
    ///
    /// Same as [`AudioArc::new`].
    pub fn from_arc(samples: Arc<[f32]>, sample_rate: u32, channels: u16) -> Self {
        assert!(channels > 0, "channels must be greater than 0");
        assert_eq!(
            samples.len() % channels as usize,
            0,
            "samples.len() must be divisible by channels"
        );
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_arc(&self) -> &Arc<[f32]> {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when both buffers point at the same heap allocation.
    pub fn shares_samples_with(&self, other: &AudioArc) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

impl PartialEq for AudioArc {
    fn eq(&self, other: &Self) -> bool {
        self.sample_rate == other.sample_rate
            && self.channels == other.channels
            && (self.shares_samples_with(other) || self.samples == other.samples)
    }
}

impl std::fmt::Debug for AudioArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArc")
            .field("frames", &self.frames())
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveformData {
    pub peaks: Vec<(f32, f32)>,
    pub samples_per_bucket: usize,
}

impl WaveformData {
    /// Min/max peaks of the mono mix-down, one pair per `samples_per_bucket` frames.
    pub fn from_audio_arc(audio: &AudioArc, samples_per_bucket: usize) -> Self {
        let channels = audio.channels() as usize;
        let peaks = audio
            .samples()
            .chunks(channels * samples_per_bucket)
            .map(|bucket| {
                bucket
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                    .fold((0.0f32, 0.0f32), |(lo, hi), s| (lo.min(s), hi.max(s)))
            })
            .collect();

        Self {
            peaks,
            samples_per_bucket,
        }
    }
}

/// A clip of audio on the timeline with explicit start and end positions.
/// Clips are non-overlapping within a track - the Track enforces this invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub start_tick: u64,
    pub end_tick: u64,
    pub audio: AudioArc,
    pub waveform: Arc<WaveformData>,
    /// Offset into the audio in samples (for trimmed starts)
    pub audio_offset: u64,
    pub name: String,
}

impl Clip {
    fn with_range(&self, start_tick: u64, end_tick: u64, audio_offset: u64) -> Clip {
        Clip {
            start_tick,
            end_tick,
            audio: self.audio.clone(),
            waveform: self.waveform.clone(),
            audio_offset,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub u64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to a track.
///
/// The live document and every history snapshot that captured a track hold the
/// same `TrackHandle`. Tracks behind a handle are never mutated while shared;
/// writers go through `Arc::make_mut`, which clones the track first when any
/// other holder exists.
pub type TrackHandle = Arc<Track>;

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Clips are always sorted by start_tick and non-overlapping.
    /// Use insert_clip() to add clips - it enforces the invariant.
    clips: Vec<Clip>,
    pub volume: f32,
    pub pan: f32,
    pub enabled: bool,
    pub solo: bool,
}

impl Track {
    pub fn new(id: TrackId, name: String) -> Self {
        Self {
            id,
            name,
            clips: Vec::new(),
            volume: 1.0,
            pan: 0.0,
            enabled: true,
            solo: false,
        }
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// End of the last clip, or 0 for an empty track.
    pub fn end_tick(&self) -> u64 {
        self.clips.last().map_or(0, |clip| clip.end_tick)
    }

    /// First clip start, or `None` for an empty track.
    pub fn start_tick(&self) -> Option<u64> {
        self.clips.first().map(|clip| clip.start_tick)
    }

    /// Insert a clip, trimming/splitting/removing any overlapping clips.
    /// The new clip takes priority - existing clips in its range are modified.
    pub fn insert_clip(&mut self, new_clip: Clip) {
        let new_start = new_clip.start_tick;
        let new_end = new_clip.end_tick;
        let mut result = Vec::with_capacity(self.clips.len() + 2);

        for existing in self.clips.drain(..) {
            let ex_start = existing.start_tick;
            let ex_end = existing.end_tick;
            let rate = existing.audio.sample_rate();

            if new_end <= ex_start || ex_end <= new_start {
                result.push(existing);
            } else if new_start <= ex_start && new_end >= ex_end {
                // fully covered
            } else if new_start > ex_start && new_end < ex_end {
                let right_offset =
                    existing.audio_offset + ticks_to_samples_approx(new_end - ex_start, rate);
                result.push(existing.with_range(ex_start, new_start, existing.audio_offset));
                result.push(existing.with_range(new_end, ex_end, right_offset));
            } else if new_start <= ex_start {
                let offset =
                    existing.audio_offset + ticks_to_samples_approx(new_end - ex_start, rate);
                result.push(existing.with_range(new_end, ex_end, offset));
            } else {
                result.push(existing.with_range(ex_start, new_start, existing.audio_offset));
            }
        }

        result.push(new_clip);
        result.retain(|clip| clip.start_tick < clip.end_tick);
        result.sort_by_key(|clip| clip.start_tick);

        self.clips = result;
    }
}

/// Approximate tick to sample conversion (assumes 120 BPM)
fn ticks_to_samples_approx(ticks: u64, sample_rate: u32) -> u64 {
    let seconds_per_tick = 0.5 / PPQN as f64;
    (ticks as f64 * seconds_per_tick * sample_rate as f64) as u64
}
