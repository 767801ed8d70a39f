//! Console output feature
//!
//! Prints station list changes to stdout while enabled.

use radioxide_core::{
    AppContext, Capability, Feature, StationId, StationList, StationListEvent, SubscriptionId,
};


pub const NAME: &str = "console-output";


#[derive( Debug, Default )]
pub struct ConsoleOutput {
    subscription: Option<SubscriptionId>,
}


impl Feature for ConsoleOutput {
    fn name( &self ) -> &'static str {
        NAME
    }


    fn capabilities( &self ) -> &'static [Capability] {
        &[ Capability::Notifications ]
    }


    fn enable( &mut self, ctx: &mut AppContext ) {
        let id = ctx.stations_mut().subscribe( |list, event| {
            if let Some( line ) = describe_event( list, event ) {
                println!( "{}", line );
            }
        });
        self.subscription = Some( id );
    }


    fn disable( &mut self, ctx: &mut AppContext ) {
        if let Some( id ) = self.subscription.take() {
            ctx.stations_mut().unsubscribe( id );
        }
    }
}


/// One-line description of a list change, `None` for changes not worth printing.
pub fn describe_event( list: &StationList, event: &StationListEvent ) -> Option<String> {
    let line = match event {
        StationListEvent::Added( id ) => format!( "+ {}", label( list, id ) ),
        StationListEvent::Removed( id ) => format!( "- {}", id ),
        StationListEvent::Moved( id ) => {
            let pos = list.position( id )?;
            format!( "~ {} moved to {}", label( list, id ), pos )
        }
        StationListEvent::Modified( id ) => {
            let station = list.get( id )?;
            match &station.stream_info().title {
                Some( title ) => format!( "♪ {}: {}", station.name_or_uri(), title ),
                None => format!( "~ {}", station.name_or_uri() ),
            }
        }
        StationListEvent::Emptied => "Station list emptied".to_string(),
        StationListEvent::Loaded => return None,
    };
    Some( line )
}


fn label( list: &StationList, id: &StationId ) -> String {
    list.get( id )
        .map( |s| s.name_or_uri().to_string() )
        .unwrap_or_else( || id.to_string() )
}


#[cfg( test )]
mod tests {
    use radioxide_core::Station;

    use super::*;


    #[test]
    fn test_event_lines() {
        let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
        let foo = list.append( Station::new( Some( "Foo" ), "http://foo.org" ).unwrap() ).unwrap();
        let bar = list.append( Station::new( None, "http://bar.com" ).unwrap() ).unwrap();

        assert_eq!( describe_event( &list, &StationListEvent::Added( foo ) ).unwrap(), "+ Foo" );
        assert_eq!( describe_event( &list, &StationListEvent::Moved( bar ) ).unwrap(), "~ http://bar.com moved to 1" );
        assert_eq!( describe_event( &list, &StationListEvent::Modified( foo ) ).unwrap(), "~ Foo" );
        assert_eq!( describe_event( &list, &StationListEvent::Emptied ).unwrap(), "Station list emptied" );
        assert!( describe_event( &list, &StationListEvent::Loaded ).is_none() );

        list.remove( &foo );
        assert_eq!( describe_event( &list, &StationListEvent::Removed( foo ) ).unwrap(), format!( "- {}", foo ) );
        assert!( describe_event( &list, &StationListEvent::Modified( foo ) ).is_none() );
    }
}
