//! Radioxide Core - Station list engine
//!
//! This crate provides the core functionality of the radio player:
//! the persistent station list, its XML store, traversal cursors,
//! the playhead, optional features and the remote-control protocol.

pub mod command;
pub mod context;
pub mod cursor;
pub mod defaults;
pub mod error;
pub mod feature;
pub mod paths;
pub mod playhead;
pub mod station;
pub mod station_list;
pub mod store;
pub mod xml;

pub use command::{ Command, CommandError, Reply };
pub use context::AppContext;
pub use cursor::StationCursor;
pub use error::StationListError;
pub use feature::{ Capability, Feature, FeatureError, FeatureRegistry, FeatureState };
pub use paths::XdgDirs;
pub use playhead::{ PlaybackBackend, PlaybackError, PlaybackState, Playhead };
pub use station::{ Station, StationId, StationOverrides, StreamInfo };
pub use station_list::{ ListKey, StationList, StationListEvent, SubscriptionId };
pub use xml::StationRecord;
