//! Station records
//!
//! A station is a named stream endpoint with a stable identity. Stations
//! are owned by exactly one station list; everything else refers to them
//! through their [`StationId`].

use std::fmt;
use std::hash::{ Hash, Hasher };
use std::str::FromStr;

use uuid::Uuid;

use crate::error::StationListError;


/// Opaque, globally unique station identifier.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub struct StationId( Uuid );


impl StationId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self( Uuid::new_v4() )
    }
}


impl Default for StationId {
    fn default() -> Self {
        Self::new()
    }
}


impl fmt::Display for StationId {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        write!( f, "{}", self.0.hyphenated() )
    }
}


impl FromStr for StationId {
    type Err = StationListError;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        Uuid::parse_str( s.trim() )
            .map( Self )
            .map_err( |_| StationListError::InvalidArgument( format!( "Invalid station id: '{}'", s ) ) )
    }
}


/// Per-station overrides persisted alongside the station.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct StationOverrides {
    /// User agent to announce when connecting to this stream.
    pub user_agent: Option<String>,
}


/// Runtime stream information, received from the playback engine.
///
/// Never persisted.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct StreamInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub organization: Option<String>,
    pub codec: Option<String>,
    pub bitrate: Option<u32>,
}


/// A single radio station.
///
/// Equality is by identity only: two stations with the same name and URI
/// are still different stations.
#[derive( Debug )]
pub struct Station {
    id: StationId,
    name: Option<String>,
    uri: String,
    overrides: StationOverrides,
    stream_info: StreamInfo,
    modified: bool,
}


impl Station {
    /// Creates a station with a fresh identifier.
    ///
    /// @param name - Display name, `None` to display the URI instead
    /// @param uri - Stream URI, must not be empty
    ///
    /// @returns The station, or `InvalidArgument` if the URI is empty
    pub fn new( name: Option<&str>, uri: &str ) -> Result<Self, StationListError> {
        Self::with_id( StationId::new(), name, uri )
    }


    /// Creates a station with an explicit identifier.
    pub fn with_id( id: StationId, name: Option<&str>, uri: &str ) -> Result<Self, StationListError> {
        let uri = validate_uri( uri )?;

        Ok( Self {
            id,
            name: normalize_text( name ),
            uri,
            overrides: StationOverrides::default(),
            stream_info: StreamInfo::default(),
            modified: false,
        })
    }


    pub fn id( &self ) -> StationId {
        self.id
    }


    pub fn name( &self ) -> Option<&str> {
        self.name.as_deref()
    }


    pub fn uri( &self ) -> &str {
        &self.uri
    }


    /// Returns the name if set, the URI otherwise.
    pub fn name_or_uri( &self ) -> &str {
        self.name.as_deref().unwrap_or( &self.uri )
    }


    pub fn overrides( &self ) -> &StationOverrides {
        &self.overrides
    }


    pub fn stream_info( &self ) -> &StreamInfo {
        &self.stream_info
    }


    /// Sets the display name. Surrounding whitespace is dropped and a blank
    /// name clears it.
    pub fn set_name( &mut self, name: Option<&str> ) {
        let name = normalize_text( name );
        if self.name == name {
            return;
        }
        self.name = name;
        self.modified = true;
    }


    /// Sets the stream URI.
    ///
    /// @returns `InvalidArgument` if the URI is empty; the station is left unchanged
    pub fn set_uri( &mut self, uri: &str ) -> Result<(), StationListError> {
        let uri = validate_uri( uri )?;
        if uri != self.uri {
            self.uri = uri;
            self.modified = true;
        }
        Ok(())
    }


    /// Sets the user agent override.
    pub fn set_user_agent( &mut self, user_agent: Option<&str> ) {
        let user_agent = normalize_text( user_agent );
        if self.overrides.user_agent == user_agent {
            return;
        }
        self.overrides.user_agent = user_agent;
        self.modified = true;
    }


    /// Replaces the runtime stream information. Does not mark the station modified.
    pub( crate ) fn set_stream_info( &mut self, info: StreamInfo ) {
        self.stream_info = info;
    }


    /// Returns and clears the "modified" flag set by the setters.
    pub( crate ) fn take_modified( &mut self ) -> bool {
        std::mem::take( &mut self.modified )
    }
}


impl PartialEq for Station {
    fn eq( &self, other: &Self ) -> bool {
        self.id == other.id
    }
}


impl Eq for Station {}


impl Hash for Station {
    fn hash<H: Hasher>( &self, state: &mut H ) {
        self.id.hash( state );
    }
}


impl fmt::Display for Station {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        write!( f, "{}", self.name_or_uri() )
    }
}


/// Stored text fields hold no surrounding whitespace and are never blank,
/// matching what the XML reader hands back.
fn normalize_text( text: Option<&str> ) -> Option<String> {
    text.map( str::trim )
        .filter( |t| !t.is_empty() )
        .map( str::to_string )
}


fn validate_uri( uri: &str ) -> Result<String, StationListError> {
    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err( StationListError::InvalidArgument( "station URI must not be empty".into() ) );
    }
    Ok( trimmed.to_string() )
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_empty_uri_rejected() {
        let result = Station::new( Some( "Foo" ), "   " );
        assert!( matches!( result, Err( StationListError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_name_or_uri() {
        let named = Station::new( Some( "Foo" ), "http://foo.org" ).unwrap();
        assert_eq!( named.name_or_uri(), "Foo" );

        let unnamed = Station::new( None, "http://foo.org" ).unwrap();
        assert_eq!( unnamed.name_or_uri(), "http://foo.org" );

        let blank = Station::new( Some( "" ), "http://foo.org" ).unwrap();
        assert_eq!( blank.name(), None );
        assert_eq!( blank.name_or_uri(), "http://foo.org" );
    }


    #[test]
    fn test_text_fields_are_trimmed() {
        let mut station = Station::new( Some( "  Foo " ), "http://foo.org" ).unwrap();
        assert_eq!( station.name(), Some( "Foo" ) );
        assert!( !station.take_modified() );

        station.set_name( Some( "Foo  " ) );
        assert!( !station.take_modified() );

        station.set_name( Some( "   " ) );
        assert_eq!( station.name(), None );
        assert!( station.take_modified() );

        station.set_user_agent( Some( " agent/1.0 " ) );
        assert_eq!( station.overrides().user_agent.as_deref(), Some( "agent/1.0" ) );
        station.set_user_agent( Some( "" ) );
        assert_eq!( station.overrides().user_agent, None );
    }


    #[test]
    fn test_equality_is_by_identity() {
        let a = Station::new( Some( "Foo" ), "http://foo.org" ).unwrap();
        let b = Station::new( Some( "Foo" ), "http://foo.org" ).unwrap();
        assert_ne!( a, b );

        let c = Station::with_id( a.id(), Some( "Other" ), "http://other.org" ).unwrap();
        assert_eq!( a, c );
    }


    #[test]
    fn test_setters_mark_modified() {
        let mut station = Station::new( Some( "Foo" ), "http://foo.org" ).unwrap();
        assert!( !station.take_modified() );

        station.set_name( Some( "Foo" ) );
        assert!( !station.take_modified() );

        station.set_name( Some( "Bar" ) );
        assert!( station.take_modified() );
        assert!( !station.take_modified() );

        station.set_uri( "http://bar.com" ).unwrap();
        assert!( station.take_modified() );

        assert!( station.set_uri( "" ).is_err() );
        assert_eq!( station.uri(), "http://bar.com" );
        assert!( !station.take_modified() );
    }


    #[test]
    fn test_stream_info_is_not_a_modification() {
        let mut station = Station::new( None, "http://foo.org" ).unwrap();
        station.set_stream_info( StreamInfo {
            title: Some( "Song".into() ),
            ..Default::default()
        });
        assert!( !station.take_modified() );
        assert_eq!( station.stream_info().title.as_deref(), Some( "Song" ) );
    }


    #[test]
    fn test_id_round_trips_through_text() {
        let id = StationId::new();
        let parsed: StationId = id.to_string().parse().unwrap();
        assert_eq!( id, parsed );
        assert!( "not-an-id".parse::<StationId>().is_err() );
    }
}
