//! Forward traversal of a station list that tolerates mutation between steps.
//!
//! The cursor does not borrow the list between steps. Each call to
//! [`StationCursor::next`] looks at the list as it is right now:
//!
//! - if the last returned station is still listed, traversal continues right
//!   after its current position, so moving it drags the cursor along;
//! - if it was removed, traversal resumes at the index it used to occupy;
//! - a station is never returned twice, even if a move puts it back ahead
//!   of the cursor;
//! - stations that were ahead of the cursor at any earlier step are not lost
//!   when a move lands them behind it; they are returned, in list order,
//!   before traversal continues.

use std::collections::HashSet;

use crate::station::StationId;
use crate::station_list::{ ListKey, StationList };


#[derive( Debug, Clone )]
pub struct StationCursor {
    list: ListKey,
    last: Option<( StationId, usize )>,
    visited: HashSet<StationId>,
    /// Unvisited stations that were ahead of the cursor at some step.
    ahead: HashSet<StationId>,
    done: bool,
}


impl StationCursor {
    /// Creates a cursor positioned before the first station of `list`.
    pub fn new( list: &StationList ) -> Self {
        Self {
            list: list.key(),
            last: None,
            visited: HashSet::new(),
            ahead: HashSet::new(),
            done: false,
        }
    }


    /// Returns the next station id, or `None` once the end is reached.
    ///
    /// # Panics
    ///
    /// If `list` is not the list the cursor was created for.
    pub fn next( &mut self, list: &StationList ) -> Option<StationId> {
        assert_eq!( self.list, list.key(), "cursor used with a different station list" );
        if self.done {
            return None;
        }

        let start = match self.last {
            None => 0,
            Some(( id, former )) => match list.position( &id ) {
                Some( pos ) => pos + 1,
                None => former,
            },
        };

        let ids = list.ids();
        let found = ids.iter()
            .enumerate()
            .take( start )
            .find( |( _, id )| self.ahead.contains( *id ) && !self.visited.contains( *id ) )
            .or_else( || {
                ids.iter()
                    .enumerate()
                    .skip( start )
                    .find( |( _, id )| !self.visited.contains( *id ) )
            })
            .map( |( pos, id )| ( *id, pos ) );

        match found {
            Some(( id, pos )) => {
                self.visited.insert( id );
                let ahead = ids.iter()
                    .enumerate()
                    .filter( |( i, other )| {
                        !self.visited.contains( *other ) && ( *i > pos || self.ahead.contains( *other ) )
                    })
                    .map( |( _, other )| *other )
                    .collect();
                self.ahead = ahead;
                self.last = Some(( id, pos ));
                Some( id )
            }
            None => {
                self.done = true;
                None
            }
        }
    }


    /// Number of stations returned so far.
    pub fn visited( &self ) -> usize {
        self.visited.len()
    }
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::station::Station;


    fn list_of( names: &[ &str ] ) -> ( StationList, Vec<StationId> ) {
        let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
        let ids = names.iter()
            .map( |n| list.append( Station::new( Some( *n ), &format!( "http://{}.org", n ) ).unwrap() ).unwrap() )
            .collect();
        ( list, ids )
    }


    #[test]
    fn test_plain_traversal() {
        let ( list, ids ) = list_of( &[ "a", "b", "c" ] );
        let mut cursor = StationCursor::new( &list );

        let seen: Vec<_> = std::iter::from_fn( || cursor.next( &list ) ).collect();
        assert_eq!( seen, ids );
        assert!( cursor.next( &list ).is_none() );
        assert_eq!( cursor.visited(), 3 );
    }


    #[test]
    fn test_empty_list() {
        let ( list, _ ) = list_of( &[] );
        let mut cursor = StationCursor::new( &list );
        assert!( cursor.next( &list ).is_none() );
    }


    #[test]
    fn test_removal_of_current_resumes_at_former_position() {
        let ( mut list, ids ) = list_of( &[ "a", "b", "c", "d" ] );
        let mut cursor = StationCursor::new( &list );

        assert_eq!( cursor.next( &list ), Some( ids[ 0 ] ) );
        assert_eq!( cursor.next( &list ), Some( ids[ 1 ] ) );
        list.remove( &ids[ 1 ] );
        assert_eq!( cursor.next( &list ), Some( ids[ 2 ] ) );
        assert_eq!( cursor.next( &list ), Some( ids[ 3 ] ) );
        assert_eq!( cursor.next( &list ), None );
    }


    #[test]
    fn test_moved_stations_are_not_repeated() {
        let ( mut list, ids ) = list_of( &[ "a", "b", "c" ] );
        let mut cursor = StationCursor::new( &list );

        assert_eq!( cursor.next( &list ), Some( ids[ 0 ] ) );
        assert_eq!( cursor.next( &list ), Some( ids[ 1 ] ) );
        list.move_first( &ids[ 1 ] );
        list.move_first( &ids[ 2 ] );
        assert_eq!( cursor.next( &list ), Some( ids[ 2 ] ) );
        assert_eq!( cursor.next( &list ), None );
    }


    #[test]
    fn test_remainder_survives_moving_current_to_end() {
        let ( mut list, ids ) = list_of( &[ "a", "b", "c" ] );
        let mut cursor = StationCursor::new( &list );

        assert_eq!( cursor.next( &list ), Some( ids[ 0 ] ) );
        list.move_last( &ids[ 0 ] );
        assert_eq!( cursor.next( &list ), Some( ids[ 1 ] ) );
        assert_eq!( cursor.next( &list ), Some( ids[ 2 ] ) );
        assert_eq!( cursor.next( &list ), None );
    }


    #[test]
    fn test_remainder_survives_moving_current_into_middle() {
        let ( mut list, ids ) = list_of( &[ "a", "b", "c", "d" ] );
        let mut cursor = StationCursor::new( &list );

        assert_eq!( cursor.next( &list ), Some( ids[ 0 ] ) );
        list.move_after( &ids[ 0 ], Some( &ids[ 2 ] ) );
        assert_eq!( list.ids(), &[ ids[ 1 ], ids[ 2 ], ids[ 0 ], ids[ 3 ] ] );

        let rest: Vec<_> = std::iter::from_fn( || cursor.next( &list ) ).collect();
        assert_eq!( rest, vec![ ids[ 1 ], ids[ 2 ], ids[ 3 ] ] );
    }


    #[test]
    fn test_remainder_is_kept_across_steps() {
        let ( mut list, ids ) = list_of( &[ "a", "b", "c", "d", "e" ] );
        let mut cursor = StationCursor::new( &list );

        assert_eq!( cursor.next( &list ), Some( ids[ 0 ] ) );
        assert_eq!( cursor.next( &list ), Some( ids[ 1 ] ) );
        list.move_first( &ids[ 3 ] );
        list.move_first( &ids[ 2 ] );
        list.move_last( &ids[ 1 ] );

        let rest: Vec<_> = std::iter::from_fn( || cursor.next( &list ) ).collect();
        assert_eq!( rest, vec![ ids[ 2 ], ids[ 3 ], ids[ 4 ] ] );
    }


    #[test]
    fn test_insertions_after_cursor_are_seen() {
        let ( mut list, ids ) = list_of( &[ "a", "b" ] );
        let mut cursor = StationCursor::new( &list );

        assert_eq!( cursor.next( &list ), Some( ids[ 0 ] ) );
        let late = list.append( Station::new( Some( "late" ), "http://late.org" ).unwrap() ).unwrap();
        assert_eq!( cursor.next( &list ), Some( ids[ 1 ] ) );
        assert_eq!( cursor.next( &list ), Some( late ) );
        assert_eq!( cursor.next( &list ), None );
    }


    #[test]
    #[should_panic( expected = "different station list" )]
    fn test_foreign_list_panics() {
        let ( list, _ ) = list_of( &[ "a" ] );
        let ( other, _ ) = list_of( &[ "b" ] );
        let mut cursor = StationCursor::new( &list );
        cursor.next( &other );
    }
}
