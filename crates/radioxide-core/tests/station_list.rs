//! Station list persistence and ordering, exercised through the public API.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use radioxide_core::{
    Station, StationCursor, StationId, StationList, StationListError, StationListEvent, XdgDirs,
};


const FOO_BAR: &str = "<Stations>
  <Station>
    <uri>http://foo.org</uri>
    <name>Foo</name>
  </Station>
  <Station>
    <uri>http://bar.com</uri>
    <name>Bar</name>
  </Station>
</Stations>";


fn names( list: &StationList ) -> Vec<String> {
    list.iter().map( |s| s.name_or_uri().to_string() ).collect()
}


fn foo_bar_list( output: &Path ) -> StationList {
    let mut list = StationList::new( "/dev/null", output );
    list.load().unwrap();
    list.append( Station::new( Some( "Foo" ), "http://foo.org" ).unwrap() ).unwrap();
    list.append( Station::new( Some( "Bar" ), "http://bar.com" ).unwrap() ).unwrap();
    list
}


#[test]
fn test_save_writes_exact_document() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join( "stations.xml" );

    let list = foo_bar_list( &output );
    list.save().unwrap();

    assert_eq!( fs::read_to_string( &output ).unwrap(), FOO_BAR );
}


#[cfg( unix )]
#[test]
fn test_save_through_symlink_keeps_link() {
    let tmp = tempfile::tempdir().unwrap();
    let real = tmp.path().join( "real.xml" );
    let link = tmp.path().join( "link.xml" );
    foo_bar_list( &real ).save().unwrap();
    std::os::unix::fs::symlink( &real, &link ).unwrap();

    let mut list = StationList::new( &link, &link );
    list.load().unwrap();
    let first = list.first().unwrap().id();
    list.remove( &first );
    list.save().unwrap();

    assert!( fs::symlink_metadata( &link ).unwrap().file_type().is_symlink() );
    assert_eq!(
        fs::read_to_string( &real ).unwrap(),
        "<Stations>\n  <Station>\n    <uri>http://bar.com</uri>\n    <name>Bar</name>\n  </Station>\n</Stations>"
    );
}


#[test]
fn test_insertion_order() {
    let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
    let s: Vec<Station> = ( 0..7 )
        .map( |i| Station::new( Some( format!( "s{}", i ).as_str() ), &format!( "http://s{}.org", i ) ).unwrap() )
        .collect();
    let mut s = s.into_iter();
    let ( s0, s1, s2, s3 ) = ( s.next().unwrap(), s.next().unwrap(), s.next().unwrap(), s.next().unwrap() );

    list.append( s1 ).unwrap();
    list.append( s2 ).unwrap();
    list.prepend( s0 ).unwrap();
    assert_eq!( names( &list ), [ "s0", "s1", "s2" ] );

    let first = list.first().unwrap().id();
    list.insert_after( s3, Some( &first ) ).unwrap();
    assert_eq!( names( &list ), [ "s0", "s3", "s1", "s2" ] );

    let first = list.first().unwrap().id();
    list.remove( &first );
    assert_eq!( names( &list ), [ "s3", "s1", "s2" ] );
}


#[test]
fn test_primary_list_seeds_and_persists_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join( "out" ).join( "stations.xml" );

    let mut list = StationList::new_primary( tmp.path().join( "missing.xml" ), &output );
    list.load().unwrap();

    assert!( !list.is_empty() );
    assert!( !list.is_save_pending() );
    let saved = fs::read_to_string( &output ).unwrap();
    for station in list.iter() {
        assert!( saved.contains( station.uri() ) );
    }
}


#[test]
fn test_auxiliary_list_is_not_seeded() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join( "stations.xml" );

    let mut list = StationList::new( tmp.path().join( "missing.xml" ), &output );
    list.load().unwrap();

    assert!( list.is_empty() );
    assert!( !output.exists() );
}


#[test]
fn test_default_locations_search_and_save() {
    let tmp = tempfile::tempdir().unwrap();
    let data_home = tmp.path().join( "data" );
    let system = tmp.path().join( "system" );
    fs::create_dir_all( system.join( "radioxide" ) ).unwrap();
    fs::write( system.join( "radioxide" ).join( "stations.xml" ), FOO_BAR ).unwrap();

    let dirs = XdgDirs {
        data_home: Some( data_home.clone() ),
        config_home: None,
        data_dirs: vec![ system.clone() ],
        config_dirs: Vec::new(),
    };
    let mut list = StationList::from_dirs( dirs );
    list.load().unwrap();
    assert_eq!( names( &list ), [ "Foo", "Bar" ] );

    let bar = list.find_by_name( "Bar" ).unwrap().id();
    list.move_first( &bar );
    assert!( list.save_if_pending().unwrap() );
    assert!( !list.save_if_pending().unwrap() );

    // The system copy is left alone, the user copy takes the change
    assert_eq!( fs::read_to_string( system.join( "radioxide" ).join( "stations.xml" ) ).unwrap(), FOO_BAR );
    let saved = fs::read_to_string( data_home.join( "radioxide" ).join( "stations.xml" ) ).unwrap();
    assert!( saved.find( "Bar" ).unwrap() < saved.find( "Foo" ).unwrap() );
}


#[test]
fn test_round_trip_reproduces_document() {
    let tmp = tempfile::tempdir().unwrap();
    let first = tmp.path().join( "first.xml" );
    let second = tmp.path().join( "second.xml" );

    let mut list = foo_bar_list( &first );
    list.append( Station::new( None, "http://nameless.net/stream" ).unwrap() ).unwrap();
    let ua = list.last().unwrap().id();
    list.update( &ua, |s| s.set_user_agent( Some( "radioxide/0.3" ) ) );
    list.save().unwrap();

    let mut reloaded = StationList::new( &first, &second );
    reloaded.load().unwrap();
    reloaded.save().unwrap();

    assert_eq!( reloaded.records(), list.records() );
    assert_eq!( fs::read( &first ).unwrap(), fs::read( &second ).unwrap() );
}


#[test]
fn test_round_trip_with_padded_and_blank_names() {
    let tmp = tempfile::tempdir().unwrap();
    let first = tmp.path().join( "first.xml" );
    let second = tmp.path().join( "second.xml" );

    let mut list = StationList::new( "/dev/null", &first );
    list.load().unwrap();
    list.append( Station::new( Some( " Foo " ), "http://foo.org" ).unwrap() ).unwrap();
    list.append( Station::new( Some( "" ), "http://bar.com" ).unwrap() ).unwrap();
    list.save().unwrap();

    let mut reloaded = StationList::new( &first, &second );
    reloaded.load().unwrap();
    reloaded.save().unwrap();

    assert_eq!( names( &reloaded ), vec![ "Foo", "http://bar.com" ] );
    assert_eq!( fs::read( &first ).unwrap(), fs::read( &second ).unwrap() );
    assert_eq!(
        fs::read_to_string( &first ).unwrap(),
        "<Stations>\n  <Station>\n    <uri>http://foo.org</uri>\n    <name>Foo</name>\n  </Station>\n  <Station>\n    <uri>http://bar.com</uri>\n  </Station>\n</Stations>",
    );
}


#[test]
fn test_malformed_input_leaves_list_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join( "stations.xml" );
    let broken = "<Stations><Station><uri>http://foo.org</uri></Station><Station><name>x</name></Station></Stations>";
    fs::write( &input, broken ).unwrap();

    let mut aux = StationList::new( &input, &input );
    assert!( matches!( aux.load(), Err( StationListError::Parse { .. } ) ) );
    assert!( aux.is_empty() );

    let mut primary = StationList::new_primary( &input, &input );
    assert!( primary.load().is_err() );
    assert!( !primary.is_empty() );
    assert!( !primary.is_save_pending() );
    assert_eq!( fs::read_to_string( &input ).unwrap(), broken );
}


#[test]
fn test_load_emits_single_event() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join( "stations.xml" );
    fs::write( &input, FOO_BAR ).unwrap();

    let mut list = StationList::new( &input, &input );
    let events = Rc::new( RefCell::new( Vec::new() ) );
    let sink = Rc::clone( &events );
    list.subscribe( move |_, event| sink.borrow_mut().push( *event ) );

    list.load().unwrap();
    assert_eq!( *events.borrow(), [ StationListEvent::Loaded ] );
    assert_eq!( list.len(), 2 );
    assert!( !list.is_save_pending() );
}


#[test]
fn test_length_and_index_invariants() {
    let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
    let mut ids: Vec<StationId> = Vec::new();
    let mut added = 0;
    let mut removed = 0;

    for i in 0..40usize {
        let station = Station::new( None, &format!( "http://s{}.org", i ) ).unwrap();
        let id = match i % 4 {
            0 => list.append( station ).unwrap(),
            1 => list.prepend( station ).unwrap(),
            2 => list.insert_before( station, ids.get( i / 3 ) ).unwrap(),
            _ => list.insert_after( station, ids.last() ).unwrap(),
        };
        ids.push( id );
        added += 1;

        if i % 5 == 4 {
            let victim = ids.remove( i % ids.len() );
            assert!( list.remove( &victim ).is_some() );
            assert!( list.remove( &victim ).is_none() );
            removed += 1;
        }
        if i % 3 == 0 {
            let target = ids[ ( i * 7 ) % ids.len() ];
            list.move_to( &target, i % 11 );
            list.move_after( &ids[ 0 ], Some( &target ) );
        }

        assert_eq!( list.len(), added - removed );
        for index in 0..list.len() {
            assert!( list.at( index ).is_some() );
        }
        assert!( list.at( list.len() ).is_none() );
    }
}


#[test]
fn test_cursor_survives_removal_from_handler() {
    let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
    for i in 0..5 {
        list.append( Station::new( Some( format!( "s{}", i ).as_str() ), &format!( "http://s{}.org", i ) ).unwrap() ).unwrap();
    }

    // Any station renamed to "drop" gets removed by a subscriber
    list.subscribe( |list, event| {
        if let StationListEvent::Modified( id ) = event {
            if list.get( id ).and_then( Station::name ) == Some( "drop" ) {
                list.remove( id );
            }
        }
    });

    let mut cursor = StationCursor::new( &list );
    let mut seen = Vec::new();
    while let Some( id ) = cursor.next( &list ) {
        seen.push( list.get( &id ).unwrap().name_or_uri().to_string() );
        if seen.len() == 2 {
            list.update( &id, |s| s.set_name( Some( "drop" ) ) );
        }
    }

    assert_eq!( seen, [ "s0", "s1", "s2", "s3", "s4" ] );
    assert_eq!( names( &list ), [ "s0", "s2", "s3", "s4" ] );
}
