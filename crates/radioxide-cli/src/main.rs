//! Radioxide CLI - Internet radio player

mod backend;
mod cli;
mod console;
mod logging;
mod settings;
mod shell;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use backend::DryRunBackend;
use cli::Args;
use console::ConsoleOutput;
use settings::Settings;
use shell::Shell;

use radioxide_core::{ AppContext, Station, StationId, StationList };


#[tokio::main( flavor = "current_thread" )]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init( args.log_level, args.log_output.as_deref() )?;

    let mut settings = Settings::load();
    tracing::debug!( "Settings: {:?}", settings );

    let mut stations = match &args.stations {
        Some( path ) => StationList::new_primary( path, path ),
        None => StationList::from_default_locations(),
    };
    if let Err( e ) = stations.load() {
        tracing::error!( "{}", e );
        eprintln!( "Failed to load stations: {}", e );
    }

    let mut ctx = AppContext::new( stations, Box::new( DryRunBackend::new() ) );
    ctx.set_repeat( settings.repeat );
    ctx.register_feature( Box::new( ConsoleOutput::default() ) )?;
    if settings.console_output && !args.background {
        ctx.enable_feature( console::NAME )?;
    }

    if let Some( id ) = startup_station( &mut ctx, &args, &settings )? {
        if let Err( e ) = ctx.play( Some( id ) ) {
            tracing::error!( "{}", e );
            eprintln!( "Failed to start playback: {}", e );
        }
    }

    let delay = Duration::from_millis( settings.autosave_delay_ms );
    let mut shell = Shell::new( ctx, delay, std::io::stdout() );
    if !args.background {
        println!( "radioxide {} - type 'help' for commands", env!( "CARGO_PKG_VERSION" ) );
    }
    shell.run( !args.background ).await?;

    let ctx = shell.finish();
    settings.repeat = ctx.playhead().repeat();
    if let Some( station ) = ctx.current_station() {
        settings.last_station = Some( station.uri().to_string() );
    }
    settings.save();

    Ok(())
}


/// Picks the station to play at startup: the command-line URI, added to the
/// list if it is not there yet, or the last station when autoplay is on.
fn startup_station( ctx: &mut AppContext, args: &Args, settings: &Settings ) -> Result<Option<StationId>> {
    if let Some( uri ) = &args.uri {
        if let Some( station ) = ctx.stations().find_by_uri( uri ) {
            return Ok( Some( station.id() ) );
        }
        let id = ctx.stations_mut().append( Station::new( None, uri )? )?;
        return Ok( Some( id ) );
    }

    if settings.autoplay {
        let last = settings.last_station.as_deref()
            .and_then( |uri| ctx.stations().find_by_uri( uri ) )
            .map( Station::id );
        return Ok( last );
    }

    Ok( None )
}
