// pmoqueueview/src/session.rs
use std::sync::Arc;

use crate::capabilities::PlaybackSnapshot;
use crate::errors::QueueViewError;
use crate::live::LiveValue;
use crate::model::{CatalogEntry, NowPlaying};

/// Transport commands accepted by the media session.
///
/// Commands are fire-and-forget: their effect is observed later through the
/// session's `playback_state` and `now_playing` values.
pub trait TransportControls: Send + Sync {
    /// Starts or resumes playback of the prepared item.
    fn play(&self) -> Result<(), QueueViewError>;

    fn pause(&self) -> Result<(), QueueViewError>;

    /// Loads the item `id` and starts playing it.
    fn play_from_id(&self, id: &str) -> Result<(), QueueViewError>;

    fn skip_to_next(&self) -> Result<(), QueueViewError>;

    fn skip_to_previous(&self) -> Result<(), QueueViewError>;
}

/// Receives the children of a queue once the session has loaded them.
pub trait CatalogSubscriber: Send + Sync {
    fn on_children_loaded(&self, queue_id: &str, children: Vec<CatalogEntry>);
}

/// Connection to the media session that owns the actual playback.
pub trait MediaSessionConnection: Send + Sync {
    /// Id of the browsable root of the session.
    fn root_queue_id(&self) -> String;

    /// True once a transport session is active on the service side.
    fn is_started(&self) -> bool;

    fn now_playing(&self) -> &LiveValue<NowPlaying>;

    fn playback_state(&self) -> &LiveValue<PlaybackSnapshot>;

    fn transport_controls(&self) -> &dyn TransportControls;

    /// Registers `subscriber` for the children of `queue_id`. Delivery may
    /// happen synchronously, from inside this call.
    fn subscribe(&self, queue_id: &str, subscriber: Arc<dyn CatalogSubscriber>);

    /// Removes a subscriber previously given to `subscribe`, matched by
    /// pointer identity.
    fn unsubscribe(&self, queue_id: &str, subscriber: &Arc<dyn CatalogSubscriber>);
}

/// Read access to the persisted user preferences.
pub trait PreferenceReader: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
}

/// `Config` keeps string preferences under its `preferences` map.
impl PreferenceReader for pmoconfig::Config {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get_preference(key)
    }
}
