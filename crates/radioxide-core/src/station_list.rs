//! Station list engine
//!
//! Owns an ordered set of stations, keeps the lookup indexes in sync with
//! the order, persists to the XML store and notifies subscribers of every
//! change.
//!
//! Notifications are queued while a mutation runs and dispatched once the
//! list is consistent again. A handler receives the list mutably and may
//! change it; the events caused by that nested change are delivered after
//! the current one, never recursively.

use std::collections::{ HashMap, VecDeque };
use std::fmt;
use std::path::{ Path, PathBuf };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::sync::{ Mutex, MutexGuard, OnceLock, PoisonError };

use crate::defaults;
use crate::error::StationListError;
use crate::paths::{ XdgDirs, STATIONS_FILE };
use crate::station::{ Station, StationId, StreamInfo };
use crate::store;
use crate::xml::StationRecord;


static NEXT_LIST_KEY: AtomicU64 = AtomicU64::new( 1 );


/// Which list owns each listed station, across every list of the process.
static OWNERS: OnceLock<Mutex<HashMap<StationId, ListKey>>> = OnceLock::new();


fn owners() -> MutexGuard<'static, HashMap<StationId, ListKey>> {
    OWNERS.get_or_init( Default::default )
        .lock()
        .unwrap_or_else( PoisonError::into_inner )
}


/// Process-unique identity of a station list instance.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub struct ListKey( u64 );


/// Change notifications emitted by a station list.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum StationListEvent {
    Added( StationId ),
    Removed( StationId ),
    Modified( StationId ),
    Moved( StationId ),
    /// Every station was removed at once.
    Emptied,
    /// `load()` finished.
    Loaded,
}


/// Handle returned by [`StationList::subscribe`].
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub struct SubscriptionId( u64 );


type Handler = Box<dyn FnMut( &mut StationList, &StationListEvent )>;


/// Where `load()` reads from.
#[derive( Debug, Clone )]
enum Input {
    Path( PathBuf ),
    Search( XdgDirs ),
}


/// Ordered, persistent collection of stations.
pub struct StationList {
    key: ListKey,
    order: Vec<StationId>,
    stations: HashMap<StationId, Station>,
    by_uri: HashMap<String, Vec<StationId>>,

    input: Input,
    output: Option<PathBuf>,
    primary: bool,
    loaded: bool,
    save_pending: bool,
    revision: u64,

    subscribers: Vec<( SubscriptionId, Handler )>,
    next_subscription: u64,
    cancelled: Vec<SubscriptionId>,
    queue: VecDeque<StationListEvent>,
    dispatching: bool,
}


impl StationList {
    /// Creates an auxiliary list bound to explicit paths.
    ///
    /// Auxiliary lists are never seeded with default stations.
    pub fn new( input: impl Into<PathBuf>, output: impl Into<PathBuf> ) -> Self {
        Self::build( Input::Path( input.into() ), Some( output.into() ), false )
    }


    /// Creates the primary list bound to explicit paths.
    pub fn new_primary( input: impl Into<PathBuf>, output: impl Into<PathBuf> ) -> Self {
        Self::build( Input::Path( input.into() ), Some( output.into() ), true )
    }


    /// Creates the primary list bound to the XDG default locations.
    pub fn from_default_locations() -> Self {
        Self::from_dirs( XdgDirs::from_env() )
    }


    /// Creates the primary list bound to the given base directories.
    pub fn from_dirs( dirs: XdgDirs ) -> Self {
        let output = dirs.output_path( STATIONS_FILE );
        Self::build( Input::Search( dirs ), output, true )
    }


    fn build( input: Input, output: Option<PathBuf>, primary: bool ) -> Self {
        Self {
            key: ListKey( NEXT_LIST_KEY.fetch_add( 1, Ordering::Relaxed ) ),
            order: Vec::new(),
            stations: HashMap::new(),
            by_uri: HashMap::new(),
            input,
            output,
            primary,
            loaded: false,
            save_pending: false,
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
            cancelled: Vec::new(),
            queue: VecDeque::new(),
            dispatching: false,
        }
    }


    pub fn key( &self ) -> ListKey {
        self.key
    }


    pub fn is_primary( &self ) -> bool {
        self.primary
    }


    /// Explicit input path, `None` when bound to the default locations.
    pub fn input_path( &self ) -> Option<&Path> {
        match &self.input {
            Input::Path( path ) => Some( path ),
            Input::Search( _ ) => None,
        }
    }


    pub fn output_path( &self ) -> Option<&Path> {
        self.output.as_deref()
    }


    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------


    pub fn len( &self ) -> usize {
        self.order.len()
    }


    pub fn is_empty( &self ) -> bool {
        self.order.is_empty()
    }


    pub fn get( &self, id: &StationId ) -> Option<&Station> {
        self.stations.get( id )
    }


    pub fn contains( &self, id: &StationId ) -> bool {
        self.stations.contains_key( id )
    }


    /// Returns the current index of a station.
    pub fn position( &self, id: &StationId ) -> Option<usize> {
        if !self.stations.contains_key( id ) {
            return None;
        }
        self.order.iter().position( |s| s == id )
    }


    pub fn first( &self ) -> Option<&Station> {
        self.order.first().and_then( |id| self.stations.get( id ) )
    }


    pub fn last( &self ) -> Option<&Station> {
        self.order.last().and_then( |id| self.stations.get( id ) )
    }


    pub fn at( &self, index: usize ) -> Option<&Station> {
        self.order.get( index ).and_then( |id| self.stations.get( id ) )
    }


    /// Station identifiers in list order.
    pub fn ids( &self ) -> &[StationId] {
        &self.order
    }


    /// Iterates over the stations in list order.
    pub fn iter( &self ) -> impl Iterator<Item = &Station> + '_ {
        self.order.iter().filter_map( |id| self.stations.get( id ) )
    }


    /// Returns the station after `id`.
    ///
    /// @param id - Reference station; `None` means "before the first"
    /// @param wrap - Wrap from the last station to the first
    /// @param allow_none - When `id` is `None`, return the first station
    ///                     instead of nothing
    pub fn next( &self, id: Option<&StationId>, wrap: bool, allow_none: bool ) -> Option<&Station> {
        if self.order.is_empty() {
            return None;
        }

        let index = match id {
            Some( id ) => self.position( id )?,
            None => return if allow_none { self.first() } else { None },
        };

        if index + 1 < self.order.len() {
            self.at( index + 1 )
        } else if wrap {
            self.first()
        } else {
            None
        }
    }


    /// Returns the station before `id`. Mirror of [`StationList::next`].
    pub fn prev( &self, id: Option<&StationId>, wrap: bool, allow_none: bool ) -> Option<&Station> {
        if self.order.is_empty() {
            return None;
        }

        let index = match id {
            Some( id ) => self.position( id )?,
            None => return if allow_none { self.last() } else { None },
        };

        if index > 0 {
            self.at( index - 1 )
        } else if wrap {
            self.last()
        } else {
            None
        }
    }


    /// Finds the first station, in list order, streaming from `uri`.
    pub fn find_by_uri( &self, uri: &str ) -> Option<&Station> {
        let candidates = self.by_uri.get( &normalize_uri( uri ) )?;
        candidates.iter()
            .filter_map( |id| self.position( id ).map( |pos| ( pos, id ) ) )
            .min_by_key( |( pos, _ )| *pos )
            .and_then( |( _, id )| self.stations.get( id ) )
    }


    /// Finds the first station, in list order, with this exact name.
    pub fn find_by_name( &self, name: &str ) -> Option<&Station> {
        self.iter().find( |s| s.name() == Some( name ) )
    }


    /// Finds a station from free text: an identifier, a name, or a URI.
    pub fn find_by_guess( &self, text: &str ) -> Option<&Station> {
        let text = text.trim();
        if let Ok( id ) = text.parse::<StationId>() {
            if let Some( station ) = self.get( &id ) {
                return Some( station );
            }
        }
        self.find_by_name( text ).or_else( || self.find_by_uri( text ) )
    }


    /// Plain records of the stations, in list order.
    pub fn records( &self ) -> Vec<StationRecord> {
        self.iter()
            .map( |s| StationRecord {
                uri: s.uri().to_string(),
                name: s.name().map( str::to_string ),
                user_agent: s.overrides().user_agent.clone(),
            })
            .collect()
    }


    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------


    /// Adds a station at the end.
    ///
    /// @returns The station id, or `DuplicateIdentifier` if it is already
    ///          listed here or in another list
    pub fn append( &mut self, station: Station ) -> Result<StationId, StationListError> {
        self.claim( &station )?;
        Ok( self.insert_at( self.order.len(), station ) )
    }


    /// Adds a station at the start.
    pub fn prepend( &mut self, station: Station ) -> Result<StationId, StationListError> {
        self.claim( &station )?;
        Ok( self.insert_at( 0, station ) )
    }


    /// Inserts a station before `reference`, or at the start if `reference` is `None`.
    pub fn insert_before(
        &mut self,
        station: Station,
        reference: Option<&StationId>,
    ) -> Result<StationId, StationListError> {
        let index = match reference {
            Some( r ) => self.position( r ).ok_or_else( || StationListError::NotFound( r.to_string() ) )?,
            None => 0,
        };
        self.claim( &station )?;
        Ok( self.insert_at( index, station ) )
    }


    /// Inserts a station after `reference`, or at the end if `reference` is `None`.
    pub fn insert_after(
        &mut self,
        station: Station,
        reference: Option<&StationId>,
    ) -> Result<StationId, StationListError> {
        let index = match reference {
            Some( r ) => self.position( r ).ok_or_else( || StationListError::NotFound( r.to_string() ) )? + 1,
            None => self.order.len(),
        };
        self.claim( &station )?;
        Ok( self.insert_at( index, station ) )
    }


    /// Removes a station and hands it back to the caller.
    ///
    /// Removing a station that is not in this list is a no-op.
    pub fn remove( &mut self, id: &StationId ) -> Option<Station> {
        let index = self.position( id )?;
        self.order.remove( index );
        let station = self.stations.remove( id )?;
        self.unindex_uri( id, station.uri() );
        owners().remove( id );

        tracing::debug!( "Removed station '{}' at {}", station.name_or_uri(), index );
        self.mark_dirty();
        self.emit( StationListEvent::Removed( *id ) );
        Some( station )
    }


    /// Moves a station to `index`, clamped to the list bounds.
    ///
    /// No-op, and no notification, if the station is absent or already there.
    pub fn move_to( &mut self, id: &StationId, index: usize ) {
        let Some( from ) = self.position( id ) else {
            return;
        };
        let to = index.min( self.order.len() - 1 );
        if from == to {
            return;
        }

        let moved = self.order.remove( from );
        self.order.insert( to, moved );

        tracing::debug!( "Moved station {} from {} to {}", id, from, to );
        self.mark_dirty();
        self.emit( StationListEvent::Moved( *id ) );
    }


    /// Moves a station right before `reference`, or first if `reference` is `None`.
    pub fn move_before( &mut self, id: &StationId, reference: Option<&StationId> ) {
        let Some( reference ) = reference else {
            return self.move_first( id );
        };
        if reference == id {
            return;
        }
        let ( Some( from ), Some( anchor ) ) = ( self.position( id ), self.position( reference ) ) else {
            return;
        };

        let to = if from < anchor { anchor - 1 } else { anchor };
        self.move_to( id, to );
    }


    /// Moves a station right after `reference`, or last if `reference` is `None`.
    pub fn move_after( &mut self, id: &StationId, reference: Option<&StationId> ) {
        let Some( reference ) = reference else {
            return self.move_last( id );
        };
        if reference == id {
            return;
        }
        let ( Some( from ), Some( anchor ) ) = ( self.position( id ), self.position( reference ) ) else {
            return;
        };

        let to = if from < anchor { anchor } else { anchor + 1 };
        self.move_to( id, to );
    }


    pub fn move_first( &mut self, id: &StationId ) {
        self.move_to( id, 0 );
    }


    pub fn move_last( &mut self, id: &StationId ) {
        self.move_to( id, usize::MAX );
    }


    /// Edits a station in place.
    ///
    /// If the closure changed a persisted attribute, the URI index is
    /// refreshed and a `Modified` notification is sent.
    ///
    /// @returns The closure's result, or `None` if the station is absent
    pub fn update<R>( &mut self, id: &StationId, edit: impl FnOnce( &mut Station ) -> R ) -> Option<R> {
        let station = self.stations.get_mut( id )?;
        let old_uri = station.uri().to_string();
        let result = edit( station );
        let modified = station.take_modified();
        let new_uri = station.uri().to_string();

        if modified {
            if old_uri != new_uri {
                self.unindex_uri( id, &old_uri );
                self.index_uri( *id, &new_uri );
            }
            self.mark_dirty();
            self.emit( StationListEvent::Modified( *id ) );
        }

        Some( result )
    }


    /// Replaces the runtime stream information of a station.
    ///
    /// Notifies subscribers but does not schedule a save.
    pub fn set_stream_info( &mut self, id: &StationId, info: StreamInfo ) {
        let Some( station ) = self.stations.get_mut( id ) else {
            return;
        };
        if station.stream_info() == &info {
            return;
        }
        station.set_stream_info( info );
        self.emit( StationListEvent::Modified( *id ) );
    }


    /// Removes every station with a single `Emptied` notification.
    pub fn empty( &mut self ) {
        if self.order.is_empty() {
            return;
        }

        let count = self.order.len();
        self.release_all();
        self.order.clear();
        self.stations.clear();
        self.by_uri.clear();

        tracing::debug!( "Emptied station list ({} stations)", count );
        self.mark_dirty();
        self.emit( StationListEvent::Emptied );
    }


    /// Records this list as the owner of `station`'s id.
    fn claim( &self, station: &Station ) -> Result<(), StationListError> {
        let id = station.id();
        let mut owners = owners();
        if self.stations.contains_key( &id ) || owners.contains_key( &id ) {
            return Err( StationListError::DuplicateIdentifier( id.to_string() ) );
        }
        owners.insert( id, self.key );
        Ok(())
    }


    fn release_all( &self ) {
        let mut owners = owners();
        for id in &self.order {
            if owners.get( id ) == Some( &self.key ) {
                owners.remove( id );
            }
        }
    }


    fn insert_at( &mut self, index: usize, mut station: Station ) -> StationId {
        let id = station.id();
        station.take_modified();
        self.index_uri( id, station.uri() );
        tracing::debug!( "Inserted station '{}' at {}", station.name_or_uri(), index );
        self.stations.insert( id, station );
        self.order.insert( index, id );

        self.mark_dirty();
        self.emit( StationListEvent::Added( id ) );
        id
    }


    fn index_uri( &mut self, id: StationId, uri: &str ) {
        self.by_uri.entry( normalize_uri( uri ) ).or_default().push( id );
    }


    fn unindex_uri( &mut self, id: &StationId, uri: &str ) {
        let key = normalize_uri( uri );
        if let Some( ids ) = self.by_uri.get_mut( &key ) {
            ids.retain( |s| s != id );
            if ids.is_empty() {
                self.by_uri.remove( &key );
            }
        }
    }


    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------


    /// Populates the list from its input.
    ///
    /// A missing input yields an empty list. A malformed input is reported
    /// and leaves the list without any of its stations. An empty primary
    /// list is seeded with the default stations, which are saved right away
    /// unless the input was malformed.
    ///
    /// # Panics
    ///
    /// If called more than once on the same list.
    pub fn load( &mut self ) -> Result<(), StationListError> {
        assert!( !self.loaded, "station list loaded twice" );
        self.loaded = true;

        let path = match &self.input {
            Input::Path( path ) => Some( path.clone() ),
            Input::Search( dirs ) => dirs.find( STATIONS_FILE ),
        };

        let result = match &path {
            Some( path ) => store::read_records( path ).and_then( stations_from_records ),
            None => Ok( Vec::new() ),
        };

        let outcome = match result {
            Ok( stations ) => {
                tracing::info!( "Loaded {} stations from {:?}", stations.len(), path );
                for station in stations {
                    self.insert_silently( station );
                }
                if self.primary && self.order.is_empty() {
                    self.seed_defaults();
                    self.save_pending = true;
                    if let Err( e ) = self.save_if_pending() {
                        tracing::warn!( "Failed to save default stations: {}", e );
                    }
                }
                Ok(())
            }
            Err( e ) => {
                tracing::warn!( "Failed to load stations from {:?}: {}", path, e );
                if self.primary && self.order.is_empty() {
                    self.seed_defaults();
                }
                Err( e )
            }
        };

        self.emit( StationListEvent::Loaded );
        outcome
    }


    /// Writes the list to its output path.
    ///
    /// The in-memory list is left untouched whatever the outcome.
    pub fn save( &self ) -> Result<(), StationListError> {
        let path = self.output.as_deref().ok_or_else( || {
            StationListError::InvalidArgument( "station list has no output path".into() )
        })?;

        store::write_records( path, &self.records() )?;
        tracing::info!( "Saved {} stations to {:?}", self.order.len(), path );
        Ok(())
    }


    /// True when a change has not been written yet.
    pub fn is_save_pending( &self ) -> bool {
        self.save_pending
    }


    /// Saves if a change is pending.
    ///
    /// One attempt per batch of changes: the pending flag is cleared even if
    /// the save fails, the next change schedules a new attempt.
    ///
    /// @returns `Ok(true)` if a save happened, `Ok(false)` if nothing was pending
    pub fn save_if_pending( &mut self ) -> Result<bool, StationListError> {
        if !self.save_pending {
            return Ok( false );
        }
        self.save_pending = false;
        self.save().map( |_| true )
    }


    /// Counter bumped by every change that needs saving.
    pub fn revision( &self ) -> u64 {
        self.revision
    }


    fn mark_dirty( &mut self ) {
        self.save_pending = true;
        self.revision += 1;
    }


    fn insert_silently( &mut self, mut station: Station ) {
        let id = station.id();
        if let Err( e ) = self.claim( &station ) {
            tracing::warn!( "Skipping station '{}': {}", station.name_or_uri(), e );
            return;
        }
        station.take_modified();
        self.index_uri( id, station.uri() );
        self.stations.insert( id, station );
        self.order.push( id );
    }


    fn seed_defaults( &mut self ) {
        match stations_from_records( defaults::default_stations() ) {
            Ok( stations ) => {
                tracing::info!( "Populating station list with {} default stations", stations.len() );
                for station in stations {
                    self.insert_silently( station );
                }
            }
            Err( e ) => tracing::error!( "Default stations are unusable: {}", e ),
        }
    }


    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------


    /// Registers a change handler.
    ///
    /// Handlers run in registration order, after the list is consistent.
    pub fn subscribe(
        &mut self,
        handler: impl FnMut( &mut StationList, &StationListEvent ) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId( self.next_subscription );
        self.next_subscription += 1;
        self.subscribers.push(( id, Box::new( handler ) ));
        id
    }


    /// Removes a change handler. Unknown ids are ignored.
    pub fn unsubscribe( &mut self, id: SubscriptionId ) {
        let before = self.subscribers.len();
        self.subscribers.retain( |( s, _ )| *s != id );
        if self.subscribers.len() == before && self.dispatching {
            // Handlers are detached while dispatching
            self.cancelled.push( id );
        }
    }


    fn emit( &mut self, event: StationListEvent ) {
        self.queue.push_back( event );
        if self.dispatching {
            return;
        }

        self.dispatching = true;
        while let Some( event ) = self.queue.pop_front() {
            let mut handlers = std::mem::take( &mut self.subscribers );
            for ( id, handler ) in handlers.iter_mut() {
                if self.cancelled.contains( id ) {
                    continue;
                }
                handler( self, &event );
            }

            // Keep handlers registered during dispatch, drop cancelled ones
            handlers.append( &mut self.subscribers );
            let cancelled = std::mem::take( &mut self.cancelled );
            handlers.retain( |( id, _ )| !cancelled.contains( id ) );
            self.subscribers = handlers;
        }
        self.dispatching = false;
    }
}


impl Drop for StationList {
    fn drop( &mut self ) {
        self.release_all();
    }
}


impl fmt::Debug for StationList {
    fn fmt( &self, f: &mut fmt::Formatter<'_> ) -> fmt::Result {
        f.debug_struct( "StationList" )
            .field( "key", &self.key )
            .field( "len", &self.order.len() )
            .field( "input", &self.input )
            .field( "output", &self.output )
            .field( "primary", &self.primary )
            .field( "loaded", &self.loaded )
            .field( "save_pending", &self.save_pending )
            .field( "revision", &self.revision )
            .field( "subscribers", &self.subscribers.len() )
            .finish()
    }
}


fn stations_from_records( records: Vec<StationRecord> ) -> Result<Vec<Station>, StationListError> {
    records.into_iter()
        .map( |record| {
            let mut station = Station::new( record.name.as_deref(), &record.uri )?;
            station.set_user_agent( record.user_agent.as_deref() );
            Ok( station )
        })
        .collect()
}


/// Normalizes a URI for lookups: trimmed, scheme and host lowercased,
/// trailing slash dropped.
fn normalize_uri( uri: &str ) -> String {
    let uri = uri.trim();
    let uri = uri.strip_suffix( '/' ).unwrap_or( uri );

    match uri.split_once( "://" ) {
        Some(( scheme, rest )) => {
            let ( host, path ) = match rest.find( '/' ) {
                Some( i ) => rest.split_at( i ),
                None => ( rest, "" ),
            };
            format!( "{}://{}{}", scheme.to_ascii_lowercase(), host.to_ascii_lowercase(), path )
        }
        None => uri.to_string(),
    }
}


#[cfg( test )]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;


    fn list() -> StationList {
        StationList::new( "/dev/null", "/dev/null/stations.xml" )
    }


    fn station( name: &str ) -> Station {
        Station::new( Some( name ), &format!( "http://{}.org", name ) ).unwrap()
    }


    fn names( list: &StationList ) -> Vec<String> {
        list.iter().map( |s| s.name_or_uri().to_string() ).collect()
    }


    fn record_events( list: &mut StationList ) -> Rc<RefCell<Vec<StationListEvent>>> {
        let events = Rc::new( RefCell::new( Vec::new() ) );
        let sink = Rc::clone( &events );
        list.subscribe( move |_, event| sink.borrow_mut().push( *event ) );
        events
    }


    #[test]
    fn test_insert_positions() {
        let mut list = list();
        let a = list.append( station( "a" ) ).unwrap();
        let c = list.append( station( "c" ) ).unwrap();
        list.insert_before( station( "b" ), Some( &c ) ).unwrap();
        list.insert_after( station( "d" ), Some( &c ) ).unwrap();
        list.insert_before( station( "first" ), None ).unwrap();
        list.insert_after( station( "last" ), None ).unwrap();
        list.insert_after( station( "a2" ), Some( &a ) ).unwrap();

        assert_eq!( names( &list ), [ "first", "a", "a2", "b", "c", "d", "last" ] );
    }


    #[test]
    fn test_insert_relative_to_absent_reference_fails() {
        let mut list = list();
        let ghost = StationId::new();
        let result = list.insert_after( station( "a" ), Some( &ghost ) );
        assert!( matches!( result, Err( StationListError::NotFound( _ ) ) ) );
        assert!( list.is_empty() );
    }


    #[test]
    fn test_duplicate_identifier_rejected() {
        let mut list = list();
        let a = list.append( station( "a" ) ).unwrap();
        let twin = Station::with_id( a, Some( "twin" ), "http://twin.org" ).unwrap();
        assert!( matches!( list.prepend( twin ), Err( StationListError::DuplicateIdentifier( _ ) ) ) );
        assert_eq!( list.len(), 1 );
    }


    #[test]
    fn test_identifier_owned_by_one_list_at_a_time() {
        let mut one = list();
        let mut two = list();
        let a = one.append( station( "a" ) ).unwrap();

        let twin = || Station::with_id( a, Some( "twin" ), "http://twin.org" ).unwrap();
        assert!( matches!( two.append( twin() ), Err( StationListError::DuplicateIdentifier( _ ) ) ) );
        assert!( matches!( two.insert_after( twin(), None ), Err( StationListError::DuplicateIdentifier( _ ) ) ) );
        assert!( two.is_empty() );

        // Removing hands the id back, so the station may move lists
        let station = one.remove( &a ).unwrap();
        assert_eq!( two.append( station ).unwrap(), a );

        two.empty();
        assert_eq!( one.prepend( twin() ).unwrap(), a );

        drop( one );
        assert_eq!( two.append( twin() ).unwrap(), a );
    }


    #[test]
    fn test_remove_is_idempotent() {
        let mut list = list();
        let a = list.append( station( "a" ) ).unwrap();
        let events = record_events( &mut list );

        let removed = list.remove( &a ).unwrap();
        assert_eq!( removed.id(), a );
        assert!( list.remove( &a ).is_none() );
        assert_eq!( *events.borrow(), vec![ StationListEvent::Removed( a ) ] );
        assert!( list.find_by_uri( "http://a.org" ).is_none() );
    }


    #[test]
    fn test_remove_foreign_station_is_noop() {
        let mut mine = list();
        let mut other = list();
        mine.append( station( "a" ) ).unwrap();
        let foreign = other.append( station( "b" ) ).unwrap();

        assert!( mine.remove( &foreign ).is_none() );
        assert_eq!( mine.len(), 1 );
        assert_eq!( other.len(), 1 );
    }


    #[test]
    fn test_move_to_clamps_and_skips_noop() {
        let mut list = list();
        let a = list.append( station( "a" ) ).unwrap();
        list.append( station( "b" ) ).unwrap();
        list.append( station( "c" ) ).unwrap();
        let events = record_events( &mut list );

        list.move_to( &a, 0 );
        assert!( events.borrow().is_empty() );

        list.move_to( &a, 99 );
        assert_eq!( names( &list ), [ "b", "c", "a" ] );
        assert_eq!( *events.borrow(), vec![ StationListEvent::Moved( a ) ] );
    }


    #[test]
    fn test_move_relative() {
        let mut list = list();
        let a = list.append( station( "a" ) ).unwrap();
        let b = list.append( station( "b" ) ).unwrap();
        let c = list.append( station( "c" ) ).unwrap();

        list.move_after( &a, Some( &b ) );
        assert_eq!( names( &list ), [ "b", "a", "c" ] );

        list.move_before( &c, Some( &b ) );
        assert_eq!( names( &list ), [ "c", "b", "a" ] );

        list.move_after( &c, Some( &a ) );
        assert_eq!( names( &list ), [ "b", "a", "c" ] );

        list.move_before( &b, Some( &c ) );
        assert_eq!( names( &list ), [ "a", "b", "c" ] );

        list.move_before( &c, None );
        assert_eq!( names( &list ), [ "c", "a", "b" ] );

        list.move_after( &c, None );
        assert_eq!( names( &list ), [ "a", "b", "c" ] );

        let events = record_events( &mut list );
        list.move_before( &a, Some( &a ) );
        list.move_after( &a, Some( &StationId::new() ) );
        list.move_before( &b, Some( &c ) );
        assert!( events.borrow().is_empty() );
        assert_eq!( names( &list ), [ "a", "b", "c" ] );
    }


    #[test]
    fn test_navigation_bounds() {
        let mut list = list();
        for wrap in [ false, true ] {
            for allow in [ false, true ] {
                assert!( list.next( None, wrap, allow ).is_none() );
                assert!( list.prev( None, wrap, allow ).is_none() );
            }
        }
        assert!( list.first().is_none() );
        assert!( list.last().is_none() );
        assert!( list.at( 0 ).is_none() );

        let only = list.append( station( "only" ) ).unwrap();
        assert_eq!( list.next( Some( &only ), true, false ).map( Station::id ), Some( only ) );
        assert_eq!( list.prev( Some( &only ), true, false ).map( Station::id ), Some( only ) );
        assert!( list.next( Some( &only ), false, false ).is_none() );

        let second = list.append( station( "second" ) ).unwrap();
        assert_eq!( list.next( None, false, true ).map( Station::id ), Some( only ) );
        assert_eq!( list.prev( None, false, true ).map( Station::id ), Some( second ) );
        assert!( list.next( None, true, false ).is_none() );
        assert_eq!( list.next( Some( &second ), true, false ).map( Station::id ), Some( only ) );
        assert_eq!( list.prev( Some( &only ), true, false ).map( Station::id ), Some( second ) );
        assert!( list.prev( Some( &only ), false, true ).is_none() );
    }


    #[test]
    fn test_lookups() {
        let mut list = list();
        let a = list.append( Station::new( Some( "Foo" ), "HTTP://Foo.ORG/live/" ).unwrap() ).unwrap();
        list.append( Station::new( None, "http://bar.com" ).unwrap() ).unwrap();

        assert_eq!( list.find_by_uri( "http://foo.org/live" ).map( Station::id ), Some( a ) );
        assert_eq!( list.find_by_name( "Foo" ).map( Station::id ), Some( a ) );
        assert_eq!( list.find_by_guess( &a.to_string() ).map( Station::id ), Some( a ) );
        assert_eq!( list.find_by_guess( "http://bar.com/" ).map( Station::name_or_uri ), Some( "http://bar.com" ) );
        assert!( list.find_by_guess( "nothing" ).is_none() );
    }


    #[test]
    fn test_find_by_uri_prefers_list_order() {
        let mut list = list();
        let later = list.append( Station::new( Some( "later" ), "http://same.org" ).unwrap() ).unwrap();
        let earlier = list.prepend( Station::new( Some( "earlier" ), "http://same.org" ).unwrap() ).unwrap();
        assert_eq!( list.find_by_uri( "http://same.org" ).map( Station::id ), Some( earlier ) );

        list.remove( &earlier );
        assert_eq!( list.find_by_uri( "http://same.org" ).map( Station::id ), Some( later ) );
    }


    #[test]
    fn test_update_reindexes_and_notifies() {
        let mut list = list();
        let a = list.append( station( "a" ) ).unwrap();
        let events = record_events( &mut list );

        list.update( &a, |s| s.set_uri( "http://moved.org" ) ).unwrap().unwrap();
        assert!( list.find_by_uri( "http://a.org" ).is_none() );
        assert_eq!( list.find_by_uri( "http://moved.org" ).map( Station::id ), Some( a ) );

        list.update( &a, |s| s.set_name( Some( "a" ) ) );
        assert_eq!( *events.borrow(), vec![ StationListEvent::Modified( a ) ] );
        assert!( list.update( &StationId::new(), |s| s.set_name( None ) ).is_none() );
    }


    #[test]
    fn test_stream_info_does_not_schedule_save() {
        let mut list = list();
        let a = list.append( station( "a" ) ).unwrap();
        list.save_pending = false;
        let events = record_events( &mut list );

        list.set_stream_info( &a, StreamInfo { title: Some( "Song".into() ), ..Default::default() } );
        assert!( !list.is_save_pending() );
        assert_eq!( *events.borrow(), vec![ StationListEvent::Modified( a ) ] );
    }


    #[test]
    fn test_empty_sends_one_notification() {
        let mut list = list();
        for name in [ "a", "b", "c" ] {
            list.append( station( name ) ).unwrap();
        }
        let events = record_events( &mut list );

        list.empty();
        list.empty();
        assert!( list.is_empty() );
        assert!( list.find_by_uri( "http://a.org" ).is_none() );
        assert_eq!( *events.borrow(), vec![ StationListEvent::Emptied ] );
    }


    #[test]
    fn test_reentrant_mutation_from_handler() {
        let mut list = list();
        let events = record_events( &mut list );

        // Evict any station named "spam" as soon as it shows up
        list.subscribe( |list, event| {
            if let StationListEvent::Added( id ) = event {
                if list.get( id ).and_then( Station::name ) == Some( "spam" ) {
                    list.remove( id );
                }
            }
        });

        let a = list.append( station( "a" ) ).unwrap();
        let spam = list.append( station( "spam" ) ).unwrap();
        let b = list.append( station( "b" ) ).unwrap();

        assert_eq!( names( &list ), [ "a", "b" ] );
        assert_eq!( list.len(), list.ids().len() );
        assert!( list.find_by_uri( "http://spam.org" ).is_none() );
        assert_eq!( *events.borrow(), vec![
            StationListEvent::Added( a ),
            StationListEvent::Added( spam ),
            StationListEvent::Removed( spam ),
            StationListEvent::Added( b ),
        ]);
    }


    #[test]
    fn test_unsubscribe_during_dispatch() {
        let mut list = list();
        let calls = Rc::new( RefCell::new( 0 ) );
        let counter = Rc::clone( &calls );
        let own_id = Rc::new( RefCell::new( None ) );
        let own_id_inner = Rc::clone( &own_id );

        let id = list.subscribe( move |list, _| {
            *counter.borrow_mut() += 1;
            if let Some( id ) = own_id_inner.borrow_mut().take() {
                list.unsubscribe( id );
            }
        });
        *own_id.borrow_mut() = Some( id );

        list.append( station( "a" ) ).unwrap();
        list.append( station( "b" ) ).unwrap();
        assert_eq!( *calls.borrow(), 1 );
    }


    #[test]
    fn test_handler_added_during_dispatch_sees_later_events() {
        let mut list = list();
        let late = Rc::new( RefCell::new( Vec::new() ) );
        let late_sink = Rc::clone( &late );
        let mut armed = true;

        list.subscribe( move |list, _| {
            if armed {
                armed = false;
                let sink = Rc::clone( &late_sink );
                list.subscribe( move |_, event| sink.borrow_mut().push( *event ) );
            }
        });

        let a = list.append( station( "a" ) ).unwrap();
        let b = list.append( station( "b" ) ).unwrap();
        assert!( !late.borrow().contains( &StationListEvent::Added( a ) ) );
        assert_eq!( *late.borrow(), vec![ StationListEvent::Added( b ) ] );
    }


    #[test]
    fn test_save_failure_leaves_list_intact() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join( "file" );
        std::fs::write( &blocker, "" ).unwrap();

        let mut list = StationList::new( "/dev/null", blocker.join( "stations.xml" ) );
        list.append( station( "a" ) ).unwrap();

        assert!( matches!( list.save_if_pending(), Err( StationListError::Io { .. } ) ) );
        assert!( !list.is_save_pending() );
        assert_eq!( names( &list ), [ "a" ] );

        list.append( station( "b" ) ).unwrap();
        assert!( list.is_save_pending() );
        assert_eq!( list.revision(), 2 );
    }


    #[test]
    #[should_panic( expected = "loaded twice" )]
    fn test_second_load_panics() {
        let mut list = list();
        list.load().unwrap();
        let _ = list.load();
    }


    #[test]
    fn test_normalize_uri() {
        assert_eq!( normalize_uri( " HTTP://Example.COM/Path/ " ), "http://example.com/Path" );
        assert_eq!( normalize_uri( "http://example.com" ), "http://example.com" );
        assert_eq!( normalize_uri( "not a uri" ), "not a uri" );
    }
}
