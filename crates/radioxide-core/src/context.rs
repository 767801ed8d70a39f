//! Application context
//!
//! Built once at startup and handed to every consumer: the station list,
//! the playhead, the playback backend and the registered features.

use std::fmt;

use crate::feature::{ Feature, FeatureError, FeatureRegistry, FeatureState };
use crate::playhead::{ PlaybackBackend, PlaybackError, PlaybackState, Playhead };
use crate::station::{ Station, StationId };
use crate::station_list::StationList;


pub struct AppContext {
    stations: StationList,
    playhead: Playhead,
    backend: Box<dyn PlaybackBackend>,
    features: FeatureRegistry,
}


impl AppContext {
    pub fn new( stations: StationList, backend: Box<dyn PlaybackBackend> ) -> Self {
        Self {
            stations,
            playhead: Playhead::default(),
            backend,
            features: FeatureRegistry::new(),
        }
    }


    pub fn stations( &self ) -> &StationList {
        &self.stations
    }


    pub fn stations_mut( &mut self ) -> &mut StationList {
        &mut self.stations
    }


    pub fn playhead( &self ) -> &Playhead {
        &self.playhead
    }


    pub fn set_repeat( &mut self, repeat: bool ) {
        self.playhead.set_repeat( repeat );
    }


    pub fn playback_state( &self ) -> PlaybackState {
        self.backend.state()
    }


    /// Station being played, if it is still listed.
    pub fn current_station( &self ) -> Option<&Station> {
        self.playhead.current( &self.stations )
    }


    /// Plays a station.
    ///
    /// @param id - Station to play; `None` resumes the current station, or
    ///             starts the first one
    ///
    /// @returns The id of the station now playing
    pub fn play( &mut self, id: Option<StationId> ) -> Result<StationId, PlaybackError> {
        let station = match id {
            Some( id ) => self.stations.get( &id ),
            None => self.playhead.current( &self.stations ).or_else( || self.stations.first() ),
        };
        let station = station.ok_or( PlaybackError::NoStation )?;
        let id = station.id();

        tracing::info!( "Playing '{}' ({})", station.name_or_uri(), station.uri() );
        self.backend.play( station.uri(), station.overrides().user_agent.as_deref() )?;
        self.playhead.set_current( Some( id ) );
        Ok( id )
    }


    /// Plays the station after the current one.
    pub fn play_next( &mut self ) -> Result<StationId, PlaybackError> {
        let next = self.playhead.next( &self.stations ).map( Station::id );
        match next {
            Some( id ) => self.play( Some( id ) ),
            None => Err( PlaybackError::NoStation ),
        }
    }


    /// Plays the station before the current one.
    pub fn play_prev( &mut self ) -> Result<StationId, PlaybackError> {
        let prev = self.playhead.prev( &self.stations ).map( Station::id );
        match prev {
            Some( id ) => self.play( Some( id ) ),
            None => Err( PlaybackError::NoStation ),
        }
    }


    pub fn stop( &mut self ) {
        if self.backend.state() != PlaybackState::Stopped {
            tracing::info!( "Stopping playback" );
        }
        self.backend.stop();
    }


    /// Removes a station, stopping playback first if it is the one playing.
    pub fn remove_station( &mut self, id: &StationId ) -> Option<Station> {
        if self.playhead.current_id().as_ref() == Some( id ) && self.stations.contains( id ) {
            self.stop();
            self.playhead.set_current( None );
        }
        self.stations.remove( id )
    }


    /// Stops playback and removes every station.
    pub fn empty_stations( &mut self ) {
        self.stop();
        self.playhead.set_current( None );
        self.stations.empty();
    }


    /// Copies fresh stream metadata from the backend onto the current station.
    pub fn refresh_stream_info( &mut self ) {
        let Some( info ) = self.backend.take_stream_info() else {
            return;
        };
        if let Some( id ) = self.playhead.current_id() {
            self.stations.set_stream_info( &id, info );
        }
    }


    // ------------------------------------------------------------------
    // Features
    // ------------------------------------------------------------------


    pub fn register_feature( &mut self, feature: Box<dyn Feature> ) -> Result<(), FeatureError> {
        self.features.register( feature )
    }


    pub fn feature_state( &self, name: &str ) -> Option<FeatureState> {
        self.features.state( name )
    }


    pub fn features( &self ) -> &FeatureRegistry {
        &self.features
    }


    pub fn enable_feature( &mut self, name: &str ) -> Result<bool, FeatureError> {
        self.with_features( |features, ctx| features.enable( name, ctx ) )
    }


    pub fn disable_feature( &mut self, name: &str ) -> Result<bool, FeatureError> {
        self.with_features( |features, ctx| features.disable( name, ctx ) )
    }


    /// Disables every feature and stops playback.
    pub fn shutdown( &mut self ) {
        self.with_features( |features, ctx| features.disable_all( ctx ) );
        self.stop();
    }


    // The registry is detached while a feature runs so it can be handed the context
    fn with_features<R>( &mut self, f: impl FnOnce( &mut FeatureRegistry, &mut AppContext ) -> R ) -> R {
        let mut features = std::mem::take( &mut self.features );
        let result = f( &mut features, self );
        self.features = features;
        result
    }
}


impl fmt::Debug for AppContext {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "AppContext" )
            .field( "stations", &self.stations )
            .field( "playhead", &self.playhead )
            .field( "state", &self.backend.state() )
            .field( "features", &self.features.names().collect::<Vec<_>>() )
            .finish()
    }
}


#[cfg( test )]
pub( crate ) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::feature::Capability;
    use crate::station::StreamInfo;
    use crate::station_list::StationListEvent;


    /// Backend that records what it was asked to play.
    #[derive( Default )]
    pub struct RecordingBackend {
        pub played: Rc<RefCell<Vec<String>>>,
        pub pending_info: Option<StreamInfo>,
        pub fail: bool,
        state: PlaybackState,
    }


    impl PlaybackBackend for RecordingBackend {
        fn play( &mut self, uri: &str, _user_agent: Option<&str> ) -> Result<(), PlaybackError> {
            if self.fail {
                return Err( PlaybackError::Backend( "unreachable stream".into() ) );
            }
            self.played.borrow_mut().push( uri.to_string() );
            self.state = PlaybackState::Playing;
            Ok(())
        }

        fn stop( &mut self ) {
            self.state = PlaybackState::Stopped;
        }

        fn state( &self ) -> PlaybackState {
            self.state
        }

        fn take_stream_info( &mut self ) -> Option<StreamInfo> {
            self.pending_info.take()
        }
    }


    pub fn test_context() -> AppContext {
        AppContext::new(
            StationList::new( "/dev/null", "/dev/null/stations.xml" ),
            Box::new( RecordingBackend::default() ),
        )
    }


    fn context_with( names: &[ &str ] ) -> ( AppContext, Rc<RefCell<Vec<String>>>, Vec<StationId> ) {
        let backend = RecordingBackend::default();
        let played = Rc::clone( &backend.played );
        let mut ctx = AppContext::new(
            StationList::new( "/dev/null", "/dev/null/stations.xml" ),
            Box::new( backend ),
        );
        let ids = names.iter()
            .map( |n| {
                let station = Station::new( Some( *n ), &format!( "http://{}.org", n ) ).unwrap();
                ctx.stations_mut().append( station ).unwrap()
            })
            .collect();
        ( ctx, played, ids )
    }


    #[test]
    fn test_play_defaults_to_first_station() {
        let ( mut ctx, played, ids ) = context_with( &[ "a", "b" ] );
        assert_eq!( ctx.play( None ), Ok( ids[ 0 ] ) );
        assert_eq!( ctx.playback_state(), PlaybackState::Playing );
        assert_eq!( *played.borrow(), [ "http://a.org" ] );
    }


    #[test]
    fn test_next_and_prev_follow_repeat() {
        let ( mut ctx, _, ids ) = context_with( &[ "a", "b" ] );
        ctx.play( Some( ids[ 1 ] ) ).unwrap();
        assert_eq!( ctx.play_next(), Err( PlaybackError::NoStation ) );

        ctx.set_repeat( true );
        assert_eq!( ctx.play_next(), Ok( ids[ 0 ] ) );
        assert_eq!( ctx.play_prev(), Ok( ids[ 1 ] ) );
    }


    #[test]
    fn test_play_on_empty_list() {
        let mut ctx = test_context();
        assert_eq!( ctx.play( None ), Err( PlaybackError::NoStation ) );
        assert_eq!( ctx.play( Some( StationId::new() ) ), Err( PlaybackError::NoStation ) );
    }


    #[test]
    fn test_backend_failure_keeps_previous_current() {
        let mut backend = RecordingBackend::default();
        backend.fail = true;
        let mut ctx = AppContext::new( StationList::new( "/dev/null", "/dev/null/stations.xml" ), Box::new( backend ) );
        ctx.stations_mut().append( Station::new( None, "http://a.org" ).unwrap() ).unwrap();

        assert!( matches!( ctx.play( None ), Err( PlaybackError::Backend( _ ) ) ) );
        assert!( ctx.playhead().current_id().is_none() );
    }


    #[test]
    fn test_removing_current_station_stops_playback() {
        let ( mut ctx, _, ids ) = context_with( &[ "a", "b" ] );
        ctx.play( Some( ids[ 0 ] ) ).unwrap();

        assert!( ctx.remove_station( &ids[ 1 ] ).is_some() );
        assert_eq!( ctx.playback_state(), PlaybackState::Playing );

        assert!( ctx.remove_station( &ids[ 0 ] ).is_some() );
        assert_eq!( ctx.playback_state(), PlaybackState::Stopped );
        assert!( ctx.current_station().is_none() );
    }


    #[test]
    fn test_stream_info_reaches_current_station() {
        let backend = RecordingBackend {
            pending_info: Some( StreamInfo { title: Some( "Song".into() ), ..Default::default() } ),
            ..Default::default()
        };
        let mut ctx = AppContext::new( StationList::new( "/dev/null", "/dev/null/stations.xml" ), Box::new( backend ) );
        let id = ctx.stations_mut().append( Station::new( None, "http://a.org" ).unwrap() ).unwrap();
        ctx.play( Some( id ) ).unwrap();

        ctx.refresh_stream_info();
        assert_eq!( ctx.current_station().unwrap().stream_info().title.as_deref(), Some( "Song" ) );
    }


    /// Counts list events while enabled.
    struct EventCounter {
        seen: Rc<RefCell<usize>>,
        subscription: Option<crate::station_list::SubscriptionId>,
    }


    impl Feature for EventCounter {
        fn name( &self ) -> &'static str {
            "counter"
        }

        fn capabilities( &self ) -> &'static [Capability] {
            &[ Capability::Notifications ]
        }

        fn enable( &mut self, ctx: &mut AppContext ) {
            let seen = Rc::clone( &self.seen );
            self.subscription = Some( ctx.stations_mut().subscribe( move |_, event: &StationListEvent| {
                if matches!( event, StationListEvent::Added( _ ) ) {
                    *seen.borrow_mut() += 1;
                }
            }));
        }

        fn disable( &mut self, ctx: &mut AppContext ) {
            if let Some( id ) = self.subscription.take() {
                ctx.stations_mut().unsubscribe( id );
            }
        }
    }


    #[test]
    fn test_feature_receives_context() {
        let mut ctx = test_context();
        let seen = Rc::new( RefCell::new( 0 ) );
        ctx.register_feature( Box::new( EventCounter { seen: Rc::clone( &seen ), subscription: None } ) ).unwrap();

        ctx.stations_mut().append( Station::new( None, "http://a.org" ).unwrap() ).unwrap();
        assert_eq!( ctx.enable_feature( "counter" ), Ok( true ) );
        ctx.stations_mut().append( Station::new( None, "http://b.org" ).unwrap() ).unwrap();
        ctx.shutdown();
        ctx.stations_mut().append( Station::new( None, "http://c.org" ).unwrap() ).unwrap();

        assert_eq!( *seen.borrow(), 1 );
        assert_eq!( ctx.feature_state( "counter" ), Some( FeatureState::Disabled ) );
    }
}
