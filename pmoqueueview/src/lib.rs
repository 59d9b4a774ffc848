//! Queue view model over a media session.
//!
//! `pmoqueueview` sits between a media session (the component that actually
//! plays audio) and a queue screen. It forwards transport commands, keeps a
//! list of display items flagged with the playback state, tracks the
//! current item and samples the playback position.

pub mod capabilities;
pub mod catalog;
pub mod errors;
pub mod live;
pub mod memory;
pub mod model;
pub mod session;
pub mod settings;
pub mod ticker;
pub mod time_utils;
pub mod view_model;

pub use capabilities::{PlaybackSnapshot, PlaybackState};
pub use catalog::{CatalogUpdate, PreviousBoundary};
pub use errors::QueueViewError;
pub use live::{LiveValue, ObserverId};
pub use memory::{InMemorySession, MemoryPreferences, MemoryTransport, TransportCommand};
pub use model::{CatalogEntry, DisplayItem, NowPlaying};
pub use session::{CatalogSubscriber, MediaSessionConnection, PreferenceReader, TransportControls};
pub use settings::QueueViewSettings;
pub use view_model::{QueueViewModel, QueueViewOutputs};
