//! Command-line argument parsing for Radioxide.

use std::path::PathBuf;

use clap::{ Parser, ValueEnum };


/// Radioxide - A lightweight internet radio player.
#[derive( Parser, Debug )]
#[command( name = "radioxide" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// Stream URI to play on startup.
    pub uri: Option<String>,

    /// Run without the command console; play until interrupted.
    #[arg( short, long )]
    pub background: bool,

    /// Log verbosity.
    #[arg( short, long, value_enum, default_value_t = LogLevel::Warn )]
    pub log_level: LogLevel,

    /// Write logs to this file instead of stderr.
    #[arg( short = 'o', long, value_name = "FILE" )]
    pub log_output: Option<PathBuf>,

    /// Station list file to load from and save to.
    #[arg( long, value_name = "FILE" )]
    pub stations: Option<PathBuf>,
}


#[derive( ValueEnum, Debug, Clone, Copy, PartialEq, Eq )]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}


impl LogLevel {
    pub fn as_str( &self ) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from([ "radioxide" ]).unwrap();
        assert_eq!( args.uri, None );
        assert!( !args.background );
        assert_eq!( args.log_level, LogLevel::Warn );
    }


    #[test]
    fn test_all_options() {
        let args = Args::try_parse_from([
            "radioxide", "-b", "-l", "debug", "-o", "/tmp/radioxide.log",
            "--stations", "/tmp/stations.xml", "http://foo.org",
        ]).unwrap();

        assert!( args.background );
        assert_eq!( args.log_level, LogLevel::Debug );
        assert_eq!( args.log_output, Some( PathBuf::from( "/tmp/radioxide.log" ) ) );
        assert_eq!( args.stations, Some( PathBuf::from( "/tmp/stations.xml" ) ) );
        assert_eq!( args.uri.as_deref(), Some( "http://foo.org" ) );
    }


    #[test]
    fn test_bad_option_fails_with_usage_code() {
        let err = Args::try_parse_from([ "radioxide", "--log-level", "loud" ]).unwrap_err();
        assert_eq!( err.exit_code(), 2 );

        let err = Args::try_parse_from([ "radioxide", "--version" ]).unwrap_err();
        assert_eq!( err.exit_code(), 0 );
    }
}
