//! Playback position within the station list
//!
//! The playhead refers to the current station by id only. Every use
//! re-resolves it through the list, so a station removed behind its back
//! simply stops resolving.

use thiserror::Error;

use crate::station::{ Station, StationId, StreamInfo };
use crate::station_list::StationList;


/// Errors reported by a playback backend.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum PlaybackError {
    #[error( "No station to play" )]
    NoStation,

    #[error( "Playback failed: {0}" )]
    Backend( String ),
}


#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}


/// Boundary to the streaming engine.
pub trait PlaybackBackend {
    /// Starts streaming from `uri`, replacing any current stream.
    fn play( &mut self, uri: &str, user_agent: Option<&str> ) -> Result<(), PlaybackError>;

    fn stop( &mut self );

    fn state( &self ) -> PlaybackState;

    /// Latest metadata read from the stream, if it changed since the last call.
    fn take_stream_info( &mut self ) -> Option<StreamInfo> {
        None
    }
}


/// Current station and repeat flag.
#[derive( Debug, Clone, Default )]
pub struct Playhead {
    current: Option<StationId>,
    repeat: bool,
}


impl Playhead {
    pub fn new( repeat: bool ) -> Self {
        Self { current: None, repeat }
    }


    /// Id of the current station, even if it no longer resolves.
    pub fn current_id( &self ) -> Option<StationId> {
        self.current
    }


    pub fn set_current( &mut self, id: Option<StationId> ) {
        self.current = id;
    }


    pub fn repeat( &self ) -> bool {
        self.repeat
    }


    pub fn set_repeat( &mut self, repeat: bool ) {
        self.repeat = repeat;
    }


    /// Current station if it is still listed.
    pub fn current<'a>( &self, list: &'a StationList ) -> Option<&'a Station> {
        self.current.as_ref().and_then( |id| list.get( id ) )
    }


    /// Station that follows the current one; the first station if there is
    /// no current one. Wraps around when repeat is on.
    pub fn next<'a>( &self, list: &'a StationList ) -> Option<&'a Station> {
        list.next( self.resolved( list ).as_ref(), self.repeat, true )
    }


    /// Station that precedes the current one. Mirror of [`Playhead::next`].
    pub fn prev<'a>( &self, list: &'a StationList ) -> Option<&'a Station> {
        list.prev( self.resolved( list ).as_ref(), self.repeat, true )
    }


    fn resolved( &self, list: &StationList ) -> Option<StationId> {
        self.current.filter( |id| list.contains( id ) )
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn list( names: &[ &str ] ) -> ( StationList, Vec<StationId> ) {
        let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
        let ids = names.iter()
            .map( |n| list.append( Station::new( Some( *n ), &format!( "http://{}.org", n ) ).unwrap() ).unwrap() )
            .collect();
        ( list, ids )
    }


    #[test]
    fn test_next_without_current_starts_at_first() {
        let ( list, ids ) = list( &[ "a", "b" ] );
        let playhead = Playhead::new( false );
        assert_eq!( playhead.next( &list ).map( Station::id ), Some( ids[ 0 ] ) );
        assert_eq!( playhead.prev( &list ).map( Station::id ), Some( ids[ 1 ] ) );
    }


    #[test]
    fn test_repeat_wraps() {
        let ( list, ids ) = list( &[ "a", "b" ] );
        let mut playhead = Playhead::new( false );
        playhead.set_current( Some( ids[ 1 ] ) );
        assert!( playhead.next( &list ).is_none() );

        playhead.set_repeat( true );
        assert_eq!( playhead.next( &list ).map( Station::id ), Some( ids[ 0 ] ) );
    }


    #[test]
    fn test_removed_current_no_longer_resolves() {
        let ( mut list, ids ) = list( &[ "a", "b" ] );
        let mut playhead = Playhead::new( false );
        playhead.set_current( Some( ids[ 0 ] ) );

        list.remove( &ids[ 0 ] );
        assert!( playhead.current( &list ).is_none() );
        assert_eq!( playhead.current_id(), Some( ids[ 0 ] ) );
        assert_eq!( playhead.next( &list ).map( Station::id ), Some( ids[ 1 ] ) );
    }
}
