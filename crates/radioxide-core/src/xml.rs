//! On-disk station list format
//!
//! ```text
//! <Stations>
//!   <Station>
//!     <uri>http://example.com/stream</uri>
//!     <name>Example</name>
//!   </Station>
//! </Stations>
//! ```
//!
//! The reader skips unknown elements and attributes. The writer emits no
//! XML declaration and no trailing newline.

use quick_xml::escape::{ escape, resolve_predefined_entity };
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::StationListError;


pub( crate ) const ROOT: &str = "Stations";
const STATION: &str = "Station";
const URI: &str = "uri";
const NAME: &str = "name";
const USER_AGENT: &str = "user-agent";


/// Plain station data as stored on disk.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct StationRecord {
    pub uri: String,
    pub name: Option<String>,
    pub user_agent: Option<String>,
}


/// Field of a station element whose text is being collected.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
enum Field {
    Uri,
    Name,
    UserAgent,
}


impl Field {
    fn from_name( name: &str ) -> Option<Self> {
        match name {
            URI => Some( Field::Uri ),
            NAME => Some( Field::Name ),
            USER_AGENT => Some( Field::UserAgent ),
            _ => None,
        }
    }
}


/// Accumulates one `<Station>` element.
#[derive( Debug, Default )]
struct PartialStation {
    uri: Option<String>,
    name: Option<String>,
    user_agent: Option<String>,
}


impl PartialStation {
    fn set( &mut self, field: Field, text: String ) {
        let value = if text.is_empty() { None } else { Some( text ) };
        match field {
            Field::Uri => self.uri = value,
            Field::Name => self.name = value,
            Field::UserAgent => self.user_agent = value,
        }
    }


    fn finish( self, index: usize ) -> Result<StationRecord, StationListError> {
        let uri = self.uri.ok_or_else( || StationListError::parse(
            STATION,
            format!( "station #{} has no <{}>", index + 1, URI ),
        ))?;

        Ok( StationRecord {
            uri,
            name: self.name,
            user_agent: self.user_agent,
        })
    }
}


/// Parses a station list document.
///
/// Empty or whitespace-only input yields an empty list.
///
/// @param text - The document
///
/// @returns Station records in document order, or a `Parse` error naming the
///          offending element
pub fn parse( text: &str ) -> Result<Vec<StationRecord>, StationListError> {
    if text.trim().is_empty() {
        return Ok( Vec::new() );
    }

    let mut reader = Reader::from_str( text );
    let mut records = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut station: Option<PartialStation> = None;
    let mut field: Option<( Field, String )> = None;

    loop {
        let event = reader.read_event().map_err( |e| {
            let element = stack.last().map( String::as_str ).unwrap_or( ROOT );
            StationListError::parse( element, format!( "{} (at byte {})", e, reader.buffer_position() ) )
        })?;

        match event {
            Event::Start( e ) => {
                let name = String::from_utf8_lossy( e.name().as_ref() ).into_owned();
                open_element( &name, &stack, &mut station, &mut field )?;
                stack.push( name );
            }
            Event::Empty( e ) => {
                let name = String::from_utf8_lossy( e.name().as_ref() ).into_owned();
                open_element( &name, &stack, &mut station, &mut field )?;
                close_element( &name, stack.len(), &mut station, &mut field, &mut records )?;
            }
            Event::End( e ) => {
                let name = String::from_utf8_lossy( e.name().as_ref() ).into_owned();
                stack.pop();
                close_element( &name, stack.len(), &mut station, &mut field, &mut records )?;
            }
            Event::Text( e ) => {
                let text = e.decode()
                    .map_err( |err| StationListError::parse( current( &stack ), err.to_string() ) )?;
                if stack.is_empty() && !text.trim().is_empty() {
                    return Err( StationListError::parse( ROOT, "text outside of the root element" ) );
                }
                append_text( &stack, &mut field, &text );
            }
            Event::CData( e ) => {
                let text = e.decode()
                    .map_err( |err| StationListError::parse( current( &stack ), err.to_string() ) )?;
                append_text( &stack, &mut field, &text );
            }
            Event::GeneralRef( e ) => {
                let resolved = if let Some( c ) = e.resolve_char_ref()
                    .map_err( |err| StationListError::parse( current( &stack ), err.to_string() ) )?
                {
                    c.to_string()
                } else {
                    let name = e.decode()
                        .map_err( |err| StationListError::parse( current( &stack ), err.to_string() ) )?;
                    resolve_predefined_entity( &name )
                        .map( str::to_string )
                        .ok_or_else( || StationListError::parse(
                            current( &stack ),
                            format!( "unknown entity '&{};'", name ),
                        ))?
                };
                append_text( &stack, &mut field, &resolved );
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some( open ) = stack.last() {
        return Err( StationListError::parse( open.as_str(), "unexpected end of document" ) );
    }

    Ok( records )
}


/// Serializes station records, two-space indented, in the given order.
pub fn serialize( records: &[StationRecord] ) -> String {
    let mut out = String::new();
    out.push_str( "<Stations>" );

    for record in records {
        out.push_str( "\n  <Station>" );
        push_field( &mut out, URI, &record.uri );
        if let Some( name ) = &record.name {
            push_field( &mut out, NAME, name );
        }
        if let Some( user_agent ) = &record.user_agent {
            push_field( &mut out, USER_AGENT, user_agent );
        }
        out.push_str( "\n  </Station>" );
    }

    out.push_str( "\n</Stations>" );
    out
}


fn push_field( out: &mut String, tag: &str, value: &str ) {
    out.push_str( "\n    <" );
    out.push_str( tag );
    out.push( '>' );
    out.push_str( &escape( value ) );
    out.push_str( "</" );
    out.push_str( tag );
    out.push( '>' );
}


fn current( stack: &[String] ) -> &str {
    stack.last().map( String::as_str ).unwrap_or( ROOT )
}


fn open_element(
    name: &str,
    stack: &[String],
    station: &mut Option<PartialStation>,
    field: &mut Option<( Field, String )>,
) -> Result<(), StationListError> {
    match stack.len() {
        0 if name != ROOT => {
            Err( StationListError::parse( name, format!( "expected <{}> as the root element", ROOT ) ) )
        }
        1 if name == STATION => {
            *station = Some( PartialStation::default() );
            Ok(())
        }
        2 if station.is_some() => {
            *field = Field::from_name( name ).map( |f| ( f, String::new() ) );
            Ok(())
        }
        _ => Ok(()),
    }
}


fn close_element(
    name: &str,
    depth: usize,
    station: &mut Option<PartialStation>,
    field: &mut Option<( Field, String )>,
    records: &mut Vec<StationRecord>,
) -> Result<(), StationListError> {
    if let Some(( f, text )) = field.take() {
        if depth == 2 && Field::from_name( name ) == Some( f ) {
            if let Some( partial ) = station.as_mut() {
                partial.set( f, text.trim().to_string() );
            }
            return Ok(());
        }
        // Closing an unknown child of a field; keep collecting
        *field = Some(( f, text ));
        return Ok(());
    }

    if depth == 1 && name == STATION {
        if let Some( partial ) = station.take() {
            records.push( partial.finish( records.len() )? );
        }
    }

    Ok(())
}


fn append_text( stack: &[String], field: &mut Option<( Field, String )>, text: &str ) {
    // Only direct text of <Station>'s known children counts
    if stack.len() != 3 {
        return;
    }
    if let Some(( _, buffer )) = field.as_mut() {
        buffer.push_str( text );
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    fn record( name: Option<&str>, uri: &str ) -> StationRecord {
        StationRecord {
            uri: uri.to_string(),
            name: name.map( str::to_string ),
            user_agent: None,
        }
    }


    #[test]
    fn test_serialize_exact_layout() {
        let text = serialize( &[
            record( Some( "Foo" ), "http://foo.org" ),
            record( Some( "Bar" ), "http://bar.com" ),
        ]);

        let expected = "<Stations>\n  <Station>\n    <uri>http://foo.org</uri>\n    <name>Foo</name>\n  </Station>\n  <Station>\n    <uri>http://bar.com</uri>\n    <name>Bar</name>\n  </Station>\n</Stations>";
        assert_eq!( text, expected );
    }


    #[test]
    fn test_serialize_omits_unset_name() {
        let text = serialize( &[ record( None, "http://foo.org" ) ] );
        assert_eq!( text, "<Stations>\n  <Station>\n    <uri>http://foo.org</uri>\n  </Station>\n</Stations>" );
    }


    #[test]
    fn test_serialize_empty() {
        assert_eq!( serialize( &[] ), "<Stations>\n</Stations>" );
        assert!( parse( &serialize( &[] ) ).unwrap().is_empty() );
    }


    #[test]
    fn test_parse_ignores_unknown_content() {
        let text = r#"<Stations version="2">
  <Playlist>ignored</Playlist>
  <Station kind="radio">
    <name>Foo</name>
    <homepage>http://foo.org/about</homepage>
    <uri>http://foo.org</uri>
  </Station>
  <!-- comment -->
  <Station>
    <uri>http://bar.com</uri>
    <user-agent>Mozilla/5.0</user-agent>
  </Station>
</Stations>"#;

        let records = parse( text ).unwrap();
        assert_eq!( records.len(), 2 );
        assert_eq!( records[ 0 ], record( Some( "Foo" ), "http://foo.org" ) );
        assert_eq!( records[ 1 ].uri, "http://bar.com" );
        assert_eq!( records[ 1 ].name, None );
        assert_eq!( records[ 1 ].user_agent.as_deref(), Some( "Mozilla/5.0" ) );
    }


    #[test]
    fn test_escaped_text_survives() {
        let records = vec![ record( Some( "Rock & Roll <24/7>" ), "http://foo.org/?a=1&b=2" ) ];
        let text = serialize( &records );
        assert!( text.contains( "Rock &amp; Roll &lt;24/7&gt;" ) );
        assert_eq!( parse( &text ).unwrap(), records );
    }


    #[test]
    fn test_blank_input_is_empty() {
        assert!( parse( "" ).unwrap().is_empty() );
        assert!( parse( "  \n" ).unwrap().is_empty() );
    }


    #[test]
    fn test_missing_uri_names_station() {
        let result = parse( "<Stations><Station><name>Foo</name></Station></Stations>" );
        match result {
            Err( StationListError::Parse { element, .. } ) => assert_eq!( element, "Station" ),
            other => panic!( "unexpected result: {:?}", other ),
        }
    }


    #[test]
    fn test_wrong_root_rejected() {
        let result = parse( "<Playlist><Station><uri>x</uri></Station></Playlist>" );
        match result {
            Err( StationListError::Parse { element, .. } ) => assert_eq!( element, "Playlist" ),
            other => panic!( "unexpected result: {:?}", other ),
        }
    }


    #[test]
    fn test_malformed_document_rejected() {
        assert!( matches!(
            parse( "<Stations><Station><uri>http://foo.org</name></Station></Stations>" ),
            Err( StationListError::Parse { .. } )
        ));
        assert!( matches!(
            parse( "<Stations><Station><uri>http://foo.org</uri>" ),
            Err( StationListError::Parse { .. } )
        ));
    }
}
