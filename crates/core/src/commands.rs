//! Track and selection edits.
//!
//! Each command mutates the live document first and then tells the history
//! what kind of step it was: structural edits push an undo stop, mixer toggles
//! and selection changes amend the current one.

use crate::document::Document;
use crate::error::HistoryError;
use crate::history::UndoPush;
use crate::project_history::ProjectHistory;
use daw_transport::TrackId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("no track with id {0}")]
    UnknownTrack(TrackId),
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveChoice {
    Up,
    Down,
    Top,
    Bottom,
}

/// Fold a non-undoable change into the current step. A fresh history has no
/// step that may be amended, so the change stays live until the next push.
fn record_modification(
    doc: &Document,
    history: &mut ProjectHistory,
    want_autosave: bool,
) -> CommandResult<()> {
    if history.can_undo() {
        history.modify_state(doc, want_autosave)?;
    }
    Ok(())
}

fn track_name(doc: &Document, id: TrackId) -> CommandResult<String> {
    doc.track(id)
        .map(|track| track.name.clone())
        .ok_or(CommandError::UnknownTrack(id))
}

// ============================================================================
// Track Commands
// ============================================================================

pub fn add_track(
    doc: &mut Document,
    history: &mut ProjectHistory,
    name: &str,
) -> CommandResult<TrackId> {
    let id = doc.add_track(name);
    history.push_state_default(&*doc, "Add Track", &format!("Created new track '{name}'"))?;
    Ok(id)
}

/// Remove every selected track. Returns how many were removed.
pub fn remove_selected_tracks(
    doc: &mut Document,
    history: &mut ProjectHistory,
) -> CommandResult<usize> {
    let selected = doc.selected_tracks();
    if selected.is_empty() {
        return Ok(0);
    }
    for id in &selected {
        doc.remove_track(*id);
    }
    history.push_state_default(&*doc, "Remove Track", "Removed audio track(s)")?;
    Ok(selected.len())
}

pub fn remove_track(
    doc: &mut Document,
    history: &mut ProjectHistory,
    id: TrackId,
) -> CommandResult<()> {
    let name = track_name(doc, id)?;
    doc.remove_track(id);
    history.push_state_default(&*doc, "Track Remove", &format!("Removed track '{name}.'"))?;
    Ok(())
}

/// Returns `false` (and records nothing) when the track is already at the edge.
pub fn move_track(
    doc: &mut Document,
    history: &mut ProjectHistory,
    id: TrackId,
    choice: MoveChoice,
) -> CommandResult<bool> {
    let name = track_name(doc, id)?;

    let (moved, long, short) = match choice {
        MoveChoice::Top => {
            let mut moved = false;
            while doc.move_track(id, true) {
                moved = true;
            }
            (moved, format!("Moved '{name}' to Top"), "Move Track to Top")
        }
        MoveChoice::Bottom => {
            let mut moved = false;
            while doc.move_track(id, false) {
                moved = true;
            }
            (moved, format!("Moved '{name}' to Bottom"), "Move Track to Bottom")
        }
        MoveChoice::Up => (doc.move_track(id, true), format!("Moved '{name}' Up"), "Move Track Up"),
        MoveChoice::Down => (
            doc.move_track(id, false),
            format!("Moved '{name}' Down"),
            "Move Track Down",
        ),
    };

    if moved {
        history.push_state_default(&*doc, short, &long)?;
    }
    Ok(moved)
}

/// Exclusive mute silences `id` and unmutes everything else.
pub fn toggle_mute(
    doc: &mut Document,
    history: &mut ProjectHistory,
    id: TrackId,
    exclusive: bool,
) -> CommandResult<()> {
    let was_muted = !doc.track(id).ok_or(CommandError::UnknownTrack(id))?.enabled;

    if exclusive {
        doc.for_each_track_mut(|track| {
            track.enabled = track.id != id;
            track.solo = false;
        });
    } else if let Some(track) = doc.track_mut(id) {
        track.enabled = was_muted;
    }

    record_modification(doc, history, true)
}

/// Exclusive solo behaves like a radio button across all tracks.
pub fn toggle_solo(
    doc: &mut Document,
    history: &mut ProjectHistory,
    id: TrackId,
    exclusive: bool,
) -> CommandResult<()> {
    let was_solo = doc.track(id).ok_or(CommandError::UnknownTrack(id))?.solo;

    if exclusive {
        doc.for_each_track_mut(|track| {
            track.solo = track.id == id && !was_solo;
        });
    } else if let Some(track) = doc.track_mut(id) {
        track.solo = !was_solo;
    }

    record_modification(doc, history, true)
}

/// Slider drags arrive as a burst of calls; they collapse into one undo step.
pub fn set_volume(
    doc: &mut Document,
    history: &mut ProjectHistory,
    id: TrackId,
    volume: f32,
) -> CommandResult<()> {
    let track = doc.track_mut(id).ok_or(CommandError::UnknownTrack(id))?;
    track.volume = volume.max(0.0);
    let long = format!("Set '{}' volume", track.name);
    history.push_state(&*doc, "Volume", &long, UndoPush::CONSOLIDATE | UndoPush::AUTOSAVE)?;
    Ok(())
}

pub fn set_pan(
    doc: &mut Document,
    history: &mut ProjectHistory,
    id: TrackId,
    pan: f32,
) -> CommandResult<()> {
    let track = doc.track_mut(id).ok_or(CommandError::UnknownTrack(id))?;
    track.pan = pan.clamp(-1.0, 1.0);
    let long = format!("Set '{}' pan", track.name);
    history.push_state(&*doc, "Pan", &long, UndoPush::CONSOLIDATE | UndoPush::AUTOSAVE)?;
    Ok(())
}

// ============================================================================
// Selection Commands
// ============================================================================

pub fn select_all(doc: &mut Document, history: &mut ProjectHistory) -> CommandResult<()> {
    let (start, end) = (doc.min_offset(), doc.end_tick());
    let ids: Vec<TrackId> = doc.tracks().iter().map(|track| track.id).collect();
    let selection = doc.selection_mut();
    selection.set_times(start, end);
    selection.tracks = ids.into_iter().collect();

    record_modification(doc, history, false)
}

/// Deselect all tracks. Not recorded in history.
pub fn select_none(doc: &mut Document) {
    doc.selection_mut().tracks.clear();
}

/// Select every track if none is selected, and all time if no range is.
pub fn select_something(doc: &mut Document, history: &mut ProjectHistory) -> CommandResult<()> {
    let no_time = doc.selection().is_point();
    let no_tracks = doc.selection().tracks.is_empty();
    if !no_time && !no_tracks {
        return Ok(());
    }
    if no_time {
        let (start, end) = (doc.min_offset(), doc.end_tick());
        doc.selection_mut().set_times(start, end);
    }
    if no_tracks {
        let ids: Vec<TrackId> = doc.tracks().iter().map(|track| track.id).collect();
        doc.selection_mut().tracks = ids.into_iter().collect();
    }
    record_modification(doc, history, false)
}

/// Click on a track in the list. `extend` toggles it within the current
/// selection instead of replacing the selection.
pub fn select_track(
    doc: &mut Document,
    history: &mut ProjectHistory,
    id: TrackId,
    extend: bool,
    modify_state: bool,
) -> CommandResult<()> {
    if doc.track(id).is_none() {
        return Err(CommandError::UnknownTrack(id));
    }

    let tracks = &mut doc.selection_mut().tracks;
    if extend {
        if !tracks.remove(&id) {
            tracks.insert(id);
        }
    } else {
        tracks.clear();
        tracks.insert(id);
    }

    if modify_state {
        record_modification(doc, history, true)?;
    }
    Ok(())
}
