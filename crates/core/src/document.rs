//! The live document and the capture/restore surface the history engine uses.

use daw_project::{SelectionData, ViewData};
use daw_transport::{Track, TrackHandle, TrackId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Selected time range plus the set of selected tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub start_tick: u64,
    pub end_tick: u64,
    pub tracks: BTreeSet<TrackId>,
}

impl Selection {
    pub fn set_times(&mut self, start_tick: u64, end_tick: u64) {
        self.start_tick = start_tick.min(end_tick);
        self.end_tick = start_tick.max(end_tick);
    }

    /// True when no time range is selected.
    pub fn is_point(&self) -> bool {
        self.start_tick == self.end_tick
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.tracks.contains(&id)
    }
}

impl From<&Selection> for SelectionData {
    fn from(selection: &Selection) -> Self {
        SelectionData {
            start_tick: selection.start_tick,
            end_tick: selection.end_tick,
            tracks: selection.tracks.iter().map(|id| id.0).collect(),
        }
    }
}

impl From<&SelectionData> for Selection {
    fn from(data: &SelectionData) -> Self {
        Selection {
            start_tick: data.start_tick,
            end_tick: data.end_tick,
            tracks: data.tracks.iter().copied().map(TrackId).collect(),
        }
    }
}

/// What the user was looking at. Kept for fidelity only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewWindow {
    pub start_tick: u64,
    pub end_tick: u64,
    pub vertical_scroll: f64,
}

impl From<&ViewWindow> for ViewData {
    fn from(view: &ViewWindow) -> Self {
        ViewData {
            start_tick: view.start_tick,
            end_tick: view.end_tick,
            vertical_scroll: view.vertical_scroll,
        }
    }
}

impl From<&ViewData> for ViewWindow {
    fn from(data: &ViewData) -> Self {
        ViewWindow {
            start_tick: data.start_tick,
            end_tick: data.end_tick,
            vertical_scroll: data.vertical_scroll,
        }
    }
}

/// Everything a snapshot records about the document.
///
/// Cloning is cheap: tracks are shared handles.
#[derive(Debug, Clone, Default)]
pub struct DocumentState {
    pub tracks: Vec<TrackHandle>,
    pub selection: Selection,
    pub view: ViewWindow,
}

impl DocumentState {
    pub fn track(&self, id: TrackId) -> Option<&TrackHandle> {
        self.tracks.iter().find(|track| track.id == id)
    }
}

/// Structural equality: the same track handles (by identity) in the same
/// order, the same selection and the same view.
impl PartialEq for DocumentState {
    fn eq(&self, other: &Self) -> bool {
        self.tracks.len() == other.tracks.len()
            && self
                .tracks
                .iter()
                .zip(&other.tracks)
                .all(|(a, b)| Arc::ptr_eq(a, b))
            && self.selection == other.selection
            && self.view == other.view
    }
}

/// The mutation surface the history engine reads from and writes back to.
///
/// The engine never edits tracks, selection or view itself; it only captures
/// the whole state and later hands a captured state back.
pub trait LiveDocument {
    fn capture(&self) -> DocumentState;
    fn restore(&mut self, state: &DocumentState);
}

/// The editable document owned by the document thread.
///
/// Every write to a track goes through [`Document::track_mut`] or
/// [`Document::for_each_track_mut`], which clone the track first if a snapshot
/// (or a clipboard) still holds the same handle.
#[derive(Debug, Default)]
pub struct Document {
    tracks: Vec<TrackHandle>,
    selection: Selection,
    view: ViewWindow,
    next_track_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let mut document = Self::new();
        document.restore(&DocumentState {
            tracks: tracks.into_iter().map(Arc::new).collect(),
            ..DocumentState::default()
        });
        document
    }

    pub fn tracks(&self) -> &[TrackHandle] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.position(id).map(|index| &*self.tracks[index])
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| track.id == id)
    }

    /// Copy-on-write access to a single track.
    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        let index = self.position(id)?;
        Some(Arc::make_mut(&mut self.tracks[index]))
    }

    pub fn for_each_track_mut(&mut self, mut f: impl FnMut(&mut Track)) {
        for handle in &mut self.tracks {
            f(Arc::make_mut(handle));
        }
    }

    pub fn add_track(&mut self, name: impl Into<String>) -> TrackId {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        self.tracks.push(Arc::new(Track::new(id, name.into())));
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<TrackHandle> {
        let index = self.position(id)?;
        self.selection.tracks.remove(&id);
        Some(self.tracks.remove(index))
    }

    pub fn can_move_up(&self, id: TrackId) -> bool {
        self.position(id).is_some_and(|index| index > 0)
    }

    pub fn can_move_down(&self, id: TrackId) -> bool {
        self.position(id)
            .is_some_and(|index| index + 1 < self.tracks.len())
    }

    /// Swap the track with its neighbour. Returns false if it cannot move.
    pub fn move_track(&mut self, id: TrackId, up: bool) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let target = if up {
            match index.checked_sub(1) {
                Some(target) => target,
                None => return false,
            }
        } else if index + 1 < self.tracks.len() {
            index + 1
        } else {
            return false;
        };
        self.tracks.swap(index, target);
        true
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn selected_tracks(&self) -> Vec<TrackId> {
        self.tracks
            .iter()
            .map(|track| track.id)
            .filter(|id| self.selection.contains(*id))
            .collect()
    }

    pub fn view(&self) -> &ViewWindow {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewWindow {
        &mut self.view
    }

    /// Earliest clip start across all tracks (0 if there are no clips).
    pub fn min_offset(&self) -> u64 {
        self.tracks
            .iter()
            .filter_map(|track| track.start_tick())
            .min()
            .unwrap_or(0)
    }

    pub fn end_tick(&self) -> u64 {
        self.tracks
            .iter()
            .map(|track| track.end_tick())
            .max()
            .unwrap_or(0)
    }
}

impl LiveDocument for Document {
    fn capture(&self) -> DocumentState {
        DocumentState {
            tracks: self.tracks.clone(),
            selection: self.selection.clone(),
            view: self.view,
        }
    }

    fn restore(&mut self, state: &DocumentState) {
        self.tracks = state.tracks.clone();
        self.selection = state.selection.clone();
        self.view = state.view;
        // ids stay unique even when restoring a state older than the newest track
        let max_id = self.tracks.iter().map(|track| track.id.0 + 1).max();
        self.next_track_id = self.next_track_id.max(max_id.unwrap_or(0));
    }
}
