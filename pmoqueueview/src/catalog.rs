//! Pure derivations over the queue catalog.
//!
//! These functions never touch the session: they take the latest known
//! values and return new items. The view model worker feeds them and
//! publishes the results.

use tracing::debug;

use crate::capabilities::PlaybackSnapshot;
use crate::errors::QueueViewError;
use crate::model::{CatalogEntry, DisplayItem, NowPlaying};

/// Which index `skip_to_previous` refuses to move away from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PreviousBoundary {
    /// Moves back from any index above 0.
    #[default]
    FirstItem,
    /// Refuses to move back from index 0 and index 1.
    SecondItem,
}

impl PreviousBoundary {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "first_item" | "first" => Some(PreviousBoundary::FirstItem),
            "second_item" | "second" | "legacy" => Some(PreviousBoundary::SecondItem),
            _ => None,
        }
    }

    /// Highest index from which a move back is refused.
    fn floor(self) -> usize {
        match self {
            PreviousBoundary::FirstItem => 0,
            PreviousBoundary::SecondItem => 1,
        }
    }
}

/// Result of a recomputation.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogUpdate {
    pub items: Vec<DisplayItem>,
    /// New current item, only set when the now-playing metadata carries a
    /// duration.
    pub current_item: Option<DisplayItem>,
}

/// Builds the display items for freshly loaded children.
pub fn build_display_items(
    entries: Vec<CatalogEntry>,
    now_playing: &NowPlaying,
    state: &PlaybackSnapshot,
) -> Vec<DisplayItem> {
    entries
        .into_iter()
        .map(|entry| DisplayItem::from_entry(entry, now_playing, state))
        .collect()
}

/// Initial current item: playing item, then the last played one, then the
/// first item.
pub fn initial_current_item(items: &[DisplayItem], last_played_id: Option<&str>) -> Option<DisplayItem> {
    items
        .iter()
        .find(|item| item.is_playing())
        .or_else(|| last_played_id.and_then(|id| items.iter().find(|item| item.id() == id)))
        .or_else(|| items.first())
        .cloned()
}

/// Re-flags `items` against a new state and now-playing metadata.
///
/// `require_current` tells whether a now-playing item with a duration must
/// be present in `items`; when it is and it is missing, the update fails.
pub fn recompute_catalog(
    items: &[DisplayItem],
    state: &PlaybackSnapshot,
    now_playing: &NowPlaying,
    queue_id: &str,
    require_current: bool,
) -> Result<CatalogUpdate, QueueViewError> {
    let active = state.is_playing_or_buffering();
    let buffering = state.is_buffering();

    let mut items: Vec<DisplayItem> = items
        .iter()
        .map(|item| {
            let is_now_playing = now_playing.is(item.id());
            item.with_playback(is_now_playing && active, is_now_playing && buffering)
        })
        .collect();

    let mut current_item = None;
    if now_playing.has_duration() && require_current {
        let id = now_playing.id().unwrap_or_default();
        let index = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| QueueViewError::now_playing_not_in_catalog(id, queue_id))?;

        let updated = items[index]
            .with_playback(active, buffering)
            .with_duration_ms(now_playing.duration_ms);
        items[index] = updated.clone();
        current_item = Some(updated);
    }

    Ok(CatalogUpdate {
        items,
        current_item,
    })
}

fn index_of(items: &[DisplayItem], current: &DisplayItem) -> Option<usize> {
    items.iter().position(|item| item.id() == current.id())
}

/// Item after `current`, or `None` when there is nowhere to go.
pub fn next_item(items: &[DisplayItem], current: Option<&DisplayItem>) -> Option<DisplayItem> {
    let index = index_of(items, current?)?;
    if index + 1 >= items.len() {
        debug!(index, len = items.len(), "Already at the last queue item");
        return None;
    }
    items.get(index + 1).cloned()
}

/// Item before `current`, honouring `boundary`.
pub fn previous_item(
    items: &[DisplayItem],
    current: Option<&DisplayItem>,
    boundary: PreviousBoundary,
) -> Option<DisplayItem> {
    let index = index_of(items, current?)?;
    if index <= boundary.floor() {
        debug!(index, ?boundary, "Refusing to move before the queue boundary");
        return None;
    }
    items.get(index - 1).cloned()
}
