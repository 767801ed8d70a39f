//! Remote-control command parsing and execution.
//!
//! One command per line. Commands are parsed from text and executed
//! against the application context. A `<station>` argument is matched by
//! id, then by name, then by URI; arguments containing spaces can be
//! double-quoted.

use std::str::FromStr;

use thiserror::Error;

use crate::context::AppContext;
use crate::error::StationListError;
use crate::playhead::{ PlaybackError, PlaybackState };
use crate::station::{ Station, StationId };


/// Errors that can occur during command parsing or execution.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum CommandError {
    #[error( "Unknown command: {0}" )]
    Unknown( String ),

    #[error( "Missing argument: {0}" )]
    MissingArgument( String ),

    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),

    #[error( "Duplicate identifier: {0}" )]
    DuplicateIdentifier( String ),

    #[error( "Not found: {0}" )]
    NotFound( String ),

    #[error( "Parse error: {0}" )]
    Parse( String ),

    #[error( "IO error: {0}" )]
    Io( String ),

    #[error( "Execution failed: {0}" )]
    ExecutionFailed( String ),
}


impl From<StationListError> for CommandError {
    fn from( e: StationListError ) -> Self {
        match e {
            StationListError::InvalidArgument( msg ) => CommandError::InvalidArgument( msg ),
            StationListError::DuplicateIdentifier( id ) => CommandError::DuplicateIdentifier( id ),
            StationListError::NotFound( what ) => CommandError::NotFound( what ),
            e @ StationListError::Parse { .. } => CommandError::Parse( e.to_string() ),
            e @ StationListError::Io { .. } => CommandError::Io( e.to_string() ),
        }
    }
}


impl From<PlaybackError> for CommandError {
    fn from( e: PlaybackError ) -> Self {
        match e {
            PlaybackError::NoStation => CommandError::NotFound( e.to_string() ),
            PlaybackError::Backend( _ ) => CommandError::ExecutionFailed( e.to_string() ),
        }
    }
}


/// Parsed remote-control command.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Command {
    // Station list commands
    List,
    Add { uri: String, name: Option<String> },
    Remove { station: String },
    Move { station: String, index: usize },
    MoveFirst { station: String },
    MoveLast { station: String },
    Rename { station: String, name: String },
    Empty,
    Save,

    // Playback commands
    Play { station: Option<String> },
    Stop,
    Next,
    Prev,
    Repeat { enabled: Option<bool> },
    Current,

    Help,
    Quit,
}


/// Result of a successfully executed command.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Reply {
    /// Text to show the caller; may be empty.
    Message( String ),
    /// The caller asked to end the session.
    Quit,
}


/// Repeat switch argument for parsing.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
struct Switch( bool );


impl FromStr for Switch {
    type Err = CommandError;


    fn from_str( s: &str ) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on" | "true" | "1" | "yes" => Ok( Switch( true ) ),
            "off" | "false" | "0" | "no" => Ok( Switch( false ) ),
            _ => Err( CommandError::InvalidArgument(
                format!( "Invalid switch: '{}'. Use 'on' or 'off'", s )
            )),
        }
    }
}


impl Command {
    /// Parses a command line.
    ///
    /// @param input - The command line to parse
    ///
    /// @returns The parsed command or an error
    pub fn parse( input: &str ) -> Result<Self, CommandError> {
        let input = input.trim();
        let mut parts = input.splitn( 2, char::is_whitespace );
        let cmd = parts.next().unwrap_or( "" ).to_lowercase();
        let args = split_args( parts.next().unwrap_or( "" ) )?;

        match cmd.as_str() {
            // Station list commands
            "list" | "ls" => Ok( Command::List ),
            "add" | "a" => {
                let ( uri, rest ) = args.split_first()
                    .ok_or_else( || CommandError::MissingArgument( "uri".into() ) )?;
                let name = if rest.is_empty() { None } else { Some( rest.join( " " ) ) };
                Ok( Command::Add { uri: uri.clone(), name } )
            }
            "remove" | "rm" | "del" => Ok( Command::Remove { station: station_arg( &args )? } ),
            "move" | "mv" => {
                if args.len() < 2 {
                    return Err( CommandError::MissingArgument( "station and index".into() ) );
                }
                let index_str = &args[ args.len() - 1 ];
                let index = index_str.parse()
                    .map_err( |_| CommandError::InvalidArgument( format!( "Invalid index: {}", index_str ) ) )?;
                Ok( Command::Move { station: args[ ..args.len() - 1 ].join( " " ), index } )
            }
            "move-first" | "top" => Ok( Command::MoveFirst { station: station_arg( &args )? } ),
            "move-last" | "bottom" => Ok( Command::MoveLast { station: station_arg( &args )? } ),
            "rename" | "rn" => {
                if args.len() < 2 {
                    return Err( CommandError::MissingArgument( "station and name".into() ) );
                }
                Ok( Command::Rename { station: args[ 0 ].clone(), name: args[ 1.. ].join( " " ) } )
            }
            "empty" | "clear" => Ok( Command::Empty ),
            "save" => Ok( Command::Save ),

            // Playback commands
            "play" | "p" => {
                let station = if args.is_empty() { None } else { Some( args.join( " " ) ) };
                Ok( Command::Play { station } )
            }
            "stop" | "st" => Ok( Command::Stop ),
            "next" | "n" => Ok( Command::Next ),
            "prev" | "previous" | "pr" => Ok( Command::Prev ),
            "repeat" | "rep" => {
                let enabled = args.first()
                    .map( |s| s.parse::<Switch>().map( |Switch( on )| on ) )
                    .transpose()?;
                Ok( Command::Repeat { enabled } )
            }
            "current" | "now" => Ok( Command::Current ),

            "help" | "h" | "?" => Ok( Command::Help ),
            "quit" | "q" | "exit" => Ok( Command::Quit ),

            "" => Err( CommandError::Unknown( "empty command".into() ) ),
            other => Err( CommandError::Unknown( other.to_string() ) ),
        }
    }


    /// Returns a brief description of the command for help text.
    pub fn description( &self ) -> &'static str {
        match self {
            Command::List => "List stations",
            Command::Add { .. } => "Add a station",
            Command::Remove { .. } => "Remove a station",
            Command::Move { .. } => "Move a station to an index",
            Command::MoveFirst { .. } => "Move a station to the top",
            Command::MoveLast { .. } => "Move a station to the bottom",
            Command::Rename { .. } => "Rename a station",
            Command::Empty => "Remove every station",
            Command::Save => "Save the station list now",
            Command::Play { .. } => "Play a station",
            Command::Stop => "Stop playback",
            Command::Next => "Next station",
            Command::Prev => "Previous station",
            Command::Repeat { .. } => "Set or toggle repeat",
            Command::Current => "Show the current station",
            Command::Help => "Show help",
            Command::Quit => "Quit application",
        }
    }


    /// Runs the command against the application.
    pub fn execute( &self, ctx: &mut AppContext ) -> Result<Reply, CommandError> {
        let message = match self {
            Command::List => list_text( ctx ),
            Command::Add { uri, name } => {
                let station = Station::new( name.as_deref(), uri )?;
                let id = ctx.stations_mut().append( station )?;
                format!( "Added {}", describe( ctx, &id ) )
            }
            Command::Remove { station } => {
                let id = resolve( ctx, station )?;
                let removed = ctx.remove_station( &id )
                    .ok_or_else( || CommandError::NotFound( station.clone() ) )?;
                format!( "Removed '{}'", removed.name_or_uri() )
            }
            Command::Move { station, index } => {
                let id = resolve( ctx, station )?;
                ctx.stations_mut().move_to( &id, *index );
                format!( "Moved {}", describe( ctx, &id ) )
            }
            Command::MoveFirst { station } => {
                let id = resolve( ctx, station )?;
                ctx.stations_mut().move_first( &id );
                format!( "Moved {}", describe( ctx, &id ) )
            }
            Command::MoveLast { station } => {
                let id = resolve( ctx, station )?;
                ctx.stations_mut().move_last( &id );
                format!( "Moved {}", describe( ctx, &id ) )
            }
            Command::Rename { station, name } => {
                let id = resolve( ctx, station )?;
                let name = if name.is_empty() { None } else { Some( name.as_str() ) };
                ctx.stations_mut().update( &id, |s| s.set_name( name ) );
                format!( "Renamed {}", describe( ctx, &id ) )
            }
            Command::Empty => {
                let count = ctx.stations().len();
                ctx.empty_stations();
                format!( "Removed {} stations", count )
            }
            Command::Save => {
                ctx.stations().save()?;
                format!( "Saved {} stations", ctx.stations().len() )
            }
            Command::Play { station } => {
                let id = station.as_deref().map( |s| resolve( ctx, s ) ).transpose()?;
                let id = ctx.play( id )?;
                format!( "Playing {}", describe( ctx, &id ) )
            }
            Command::Stop => {
                ctx.stop();
                "Stopped".to_string()
            }
            Command::Next => {
                let id = ctx.play_next()?;
                format!( "Playing {}", describe( ctx, &id ) )
            }
            Command::Prev => {
                let id = ctx.play_prev()?;
                format!( "Playing {}", describe( ctx, &id ) )
            }
            Command::Repeat { enabled } => {
                let repeat = enabled.unwrap_or( !ctx.playhead().repeat() );
                ctx.set_repeat( repeat );
                format!( "Repeat {}", if repeat { "on" } else { "off" } )
            }
            Command::Current => current_text( ctx ),
            Command::Help => help_text().to_string(),
            Command::Quit => return Ok( Reply::Quit ),
        };

        Ok( Reply::Message( message ) )
    }
}


/// Splits arguments on whitespace, keeping double-quoted runs together.
fn split_args( input: &str ) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in input.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    args.push( std::mem::take( &mut current ) );
                    in_token = false;
                }
            }
            c => {
                current.push( c );
                in_token = true;
            }
        }
    }

    if quoted {
        return Err( CommandError::InvalidArgument( "Unterminated quote".into() ) );
    }
    if in_token {
        args.push( current );
    }
    Ok( args )
}


fn station_arg( args: &[String] ) -> Result<String, CommandError> {
    if args.is_empty() {
        return Err( CommandError::MissingArgument( "station".into() ) );
    }
    Ok( args.join( " " ) )
}


fn resolve( ctx: &AppContext, text: &str ) -> Result<StationId, CommandError> {
    ctx.stations()
        .find_by_guess( text )
        .map( Station::id )
        .ok_or_else( || CommandError::NotFound( text.to_string() ) )
}


fn describe( ctx: &AppContext, id: &StationId ) -> String {
    let list = ctx.stations();
    match ( list.get( id ), list.position( id ) ) {
        ( Some( station ), Some( pos ) ) => format!( "'{}' at {}", station.name_or_uri(), pos ),
        _ => id.to_string(),
    }
}


fn list_text( ctx: &AppContext ) -> String {
    let list = ctx.stations();
    if list.is_empty() {
        return "No stations".to_string();
    }

    let current = ctx.playhead().current_id();
    list.iter()
        .enumerate()
        .map( |( i, s )| {
            let marker = if Some( s.id() ) == current { '*' } else { ' ' };
            format!( "{}{:>3}  {}  <{}>  {}", marker, i, s.name_or_uri(), s.uri(), s.id() )
        })
        .collect::<Vec<_>>()
        .join( "\n" )
}


fn current_text( ctx: &AppContext ) -> String {
    let Some( station ) = ctx.current_station() else {
        return "Nothing selected".to_string();
    };

    let state = match ctx.playback_state() {
        PlaybackState::Playing => "Playing",
        PlaybackState::Stopped => "Stopped",
    };
    let mut text = format!( "{}: {} <{}>", state, station.name_or_uri(), station.uri() );

    let info = station.stream_info();
    match ( &info.artist, &info.title ) {
        ( Some( artist ), Some( title ) ) => text.push_str( &format!( "\n  {} - {}", artist, title ) ),
        ( None, Some( title ) ) => text.push_str( &format!( "\n  {}", title ) ),
        _ => {}
    }
    if let Some( bitrate ) = info.bitrate {
        text.push_str( &format!( "\n  {} kbps", bitrate / 1000 ) );
    }
    text
}


/// Returns help text listing all available commands.
pub fn help_text() -> &'static str {
    r#"Station Commands:
  list                     List stations
  add <uri> [name]         Add a station
  remove <station>         Remove a station
  move <station> <index>   Move a station to an index
  move-first <station>     Move a station to the top
  move-last <station>      Move a station to the bottom
  rename <station> <name>  Rename a station
  empty                    Remove every station
  save                     Save the station list now

Playback Commands:
  play [station]           Play a station (default: current or first)
  stop                     Stop playback
  next                     Next station
  prev                     Previous station
  repeat [on|off]          Set or toggle repeat
  current                  Show the current station

Other Commands:
  help                     Show this help
  quit                     Exit radioxide

<station> is an id, a name or a URI. Quote arguments containing spaces."#
}


#[cfg( test )]
mod tests {
    use super::*;
    use crate::context::tests::test_context;


    fn run( ctx: &mut AppContext, line: &str ) -> Result<Reply, CommandError> {
        Command::parse( line )?.execute( ctx )
    }


    fn names( ctx: &AppContext ) -> Vec<String> {
        ctx.stations().iter().map( |s| s.name_or_uri().to_string() ).collect()
    }


    #[test]
    fn test_parse_add() {
        let cmd = Command::parse( "add http://foo.org Foo FM" ).unwrap();
        assert_eq!( cmd, Command::Add { uri: "http://foo.org".into(), name: Some( "Foo FM".into() ) } );
    }


    #[test]
    fn test_parse_add_without_name() {
        let cmd = Command::parse( "a http://foo.org" ).unwrap();
        assert_eq!( cmd, Command::Add { uri: "http://foo.org".into(), name: None } );
    }


    #[test]
    fn test_parse_quoted_arguments() {
        let cmd = Command::parse( r#"rename "Groove Salad" "Groove Salad Classic""# ).unwrap();
        assert_eq!( cmd, Command::Rename { station: "Groove Salad".into(), name: "Groove Salad Classic".into() } );
    }


    #[test]
    fn test_parse_move() {
        let cmd = Command::parse( "move Drone Zone 3" ).unwrap();
        assert_eq!( cmd, Command::Move { station: "Drone Zone".into(), index: 3 } );
        assert!( matches!( Command::parse( "move foo bar" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_repeat() {
        assert_eq!( Command::parse( "repeat on" ).unwrap(), Command::Repeat { enabled: Some( true ) } );
        assert_eq!( Command::parse( "repeat" ).unwrap(), Command::Repeat { enabled: None } );
        assert!( matches!( Command::parse( "repeat maybe" ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_parse_unknown() {
        assert!( matches!( Command::parse( "foobar" ), Err( CommandError::Unknown( _ ) ) ) );
        assert!( matches!( Command::parse( "   " ), Err( CommandError::Unknown( _ ) ) ) );
    }


    #[test]
    fn test_parse_missing_arg() {
        assert!( matches!( Command::parse( "add" ), Err( CommandError::MissingArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "remove" ), Err( CommandError::MissingArgument( _ ) ) ) );
        assert!( matches!( Command::parse( "rename foo" ), Err( CommandError::MissingArgument( _ ) ) ) );
        assert!( matches!( Command::parse( r#"play "foo"# ), Err( CommandError::InvalidArgument( _ ) ) ) );
    }


    #[test]
    fn test_execute_list_editing() {
        let mut ctx = test_context();
        run( &mut ctx, "add http://foo.org Foo" ).unwrap();
        run( &mut ctx, "add http://bar.com Bar" ).unwrap();
        run( &mut ctx, "add http://baz.net" ).unwrap();
        assert_eq!( names( &ctx ), [ "Foo", "Bar", "http://baz.net" ] );

        run( &mut ctx, "move-first http://baz.net/" ).unwrap();
        run( &mut ctx, "move Foo 9" ).unwrap();
        assert_eq!( names( &ctx ), [ "http://baz.net", "Bar", "Foo" ] );

        run( &mut ctx, "rename Bar Bar FM" ).unwrap();
        run( &mut ctx, "remove http://baz.net" ).unwrap();
        assert_eq!( names( &ctx ), [ "Bar FM", "Foo" ] );

        let reply = run( &mut ctx, "empty" ).unwrap();
        assert_eq!( reply, Reply::Message( "Removed 2 stations".into() ) );
        assert!( ctx.stations().is_empty() );
    }


    #[test]
    fn test_execute_errors_map_taxonomy() {
        let mut ctx = test_context();
        assert_eq!( run( &mut ctx, "remove ghost" ), Err( CommandError::NotFound( "ghost".into() ) ) );
        assert!( matches!( run( &mut ctx, r#"add "  ""# ), Err( CommandError::InvalidArgument( _ ) ) ) );
        assert!( matches!( run( &mut ctx, "next" ), Err( CommandError::NotFound( _ ) ) ) );
        assert!( matches!( run( &mut ctx, "save" ), Err( CommandError::Io( _ ) ) ) );
    }


    #[test]
    fn test_execute_playback() {
        let mut ctx = test_context();
        run( &mut ctx, "add http://foo.org Foo" ).unwrap();
        run( &mut ctx, "add http://bar.com Bar" ).unwrap();

        assert_eq!( run( &mut ctx, "play" ).unwrap(), Reply::Message( "Playing 'Foo' at 0".into() ) );
        assert_eq!( run( &mut ctx, "next" ).unwrap(), Reply::Message( "Playing 'Bar' at 1".into() ) );
        assert_eq!( run( &mut ctx, "repeat" ).unwrap(), Reply::Message( "Repeat on".into() ) );
        assert_eq!( run( &mut ctx, "next" ).unwrap(), Reply::Message( "Playing 'Foo' at 0".into() ) );

        let Reply::Message( current ) = run( &mut ctx, "current" ).unwrap() else {
            panic!( "expected a message" );
        };
        assert!( current.starts_with( "Playing: Foo" ) );

        let Reply::Message( list ) = run( &mut ctx, "list" ).unwrap() else {
            panic!( "expected a message" );
        };
        assert!( list.lines().next().unwrap().starts_with( "*  0  Foo" ) );

        run( &mut ctx, "stop" ).unwrap();
        assert_eq!( ctx.playback_state(), PlaybackState::Stopped );
        assert_eq!( run( &mut ctx, "quit" ).unwrap(), Reply::Quit );
    }


    #[test]
    fn test_error_conversion_is_total() {
        let cases = [
            ( StationListError::InvalidArgument( "x".into() ), "InvalidArgument" ),
            ( StationListError::DuplicateIdentifier( "x".into() ), "DuplicateIdentifier" ),
            ( StationListError::NotFound( "x".into() ), "NotFound" ),
            ( StationListError::parse( "Station", "x" ), "Parse" ),
            ( StationListError::io( "/x", std::io::Error::other( "x" ) ), "Io" ),
        ];

        for ( error, expected ) in cases {
            let converted = format!( "{:?}", CommandError::from( error ) );
            assert!( converted.starts_with( expected ), "{} vs {}", converted, expected );
        }
    }
}
