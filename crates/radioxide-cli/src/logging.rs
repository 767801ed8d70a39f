//! Log output setup.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{ anyhow, Context, Result };
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;


/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// @param level - Verbosity for the radioxide crates
/// @param output - Log file, appended to; stderr if `None`
pub fn init( level: LogLevel, output: Option<&Path> ) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else( |_| EnvFilter::new( format!( "radioxide={}", level.as_str() ) ) );

    let builder = tracing_subscriber::fmt().with_env_filter( filter );
    let result = match output {
        Some( path ) => {
            let file = OpenOptions::new()
                .create( true )
                .append( true )
                .open( path )
                .with_context( || format!( "Failed to open log file {}", path.display() ) )?;
            builder.with_ansi( false ).with_writer( Mutex::new( file ) ).try_init()
        }
        None => builder.with_writer( std::io::stderr ).try_init(),
    };

    result.map_err( |e| anyhow!( "Failed to install logger: {}", e ) )
}
