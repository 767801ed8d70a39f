//! Event loop
//!
//! Reads remote-control commands from stdin, refreshes stream metadata and
//! writes the station list once changes have settled.

use std::io::Write;
use std::time::{ Duration, Instant };

use anyhow::Result;
use tokio::io::{ AsyncBufReadExt, BufReader };

use radioxide_core::{ AppContext, Command, Reply, StationList };


const METADATA_POLL: Duration = Duration::from_secs( 1 );


/// Debounced save scheduling.
///
/// Every new change to the list pushes the deadline back; the save happens
/// once the list has been quiet for the whole delay.
#[derive( Debug )]
pub struct Autosave {
    delay: Duration,
    seen_revision: u64,
    deadline: Option<Instant>,
}


impl Autosave {
    pub fn new( delay: Duration, list: &StationList ) -> Self {
        Self {
            delay,
            seen_revision: list.revision(),
            deadline: None,
        }
    }


    /// Reschedules the save if the list changed since the last look.
    pub fn observe( &mut self, list: &StationList, now: Instant ) {
        let revision = list.revision();
        if revision != self.seen_revision {
            self.seen_revision = revision;
            self.deadline = Some( now + self.delay );
        }
    }


    pub fn deadline( &self ) -> Option<Instant> {
        self.deadline
    }


    /// Writes pending changes now. Failures are logged; the next change retries.
    pub fn flush( &mut self, list: &mut StationList ) {
        self.deadline = None;
        match list.save_if_pending() {
            Ok( true ) => tracing::debug!( "Autosaved station list" ),
            Ok( false ) => {}
            Err( e ) => tracing::warn!( "Failed to save station list: {}", e ),
        }
    }
}


/// Command console over the application context.
pub struct Shell<W: Write> {
    ctx: AppContext,
    autosave: Autosave,
    out: W,
}


impl<W: Write> Shell<W> {
    pub fn new( ctx: AppContext, autosave_delay: Duration, out: W ) -> Self {
        let autosave = Autosave::new( autosave_delay, ctx.stations() );
        Self { ctx, autosave, out }
    }


    #[cfg( test )]
    pub fn context( &self ) -> &AppContext {
        &self.ctx
    }


    /// Runs one command line.
    ///
    /// @returns `false` once the user asked to quit
    pub fn handle_line( &mut self, line: &str ) -> Result<bool> {
        let line = line.trim();
        if line.is_empty() {
            return Ok( true );
        }

        let result = Command::parse( line ).and_then( |cmd| cmd.execute( &mut self.ctx ) );
        self.autosave.observe( self.ctx.stations(), Instant::now() );

        match result {
            Ok( Reply::Message( text ) ) => {
                if !text.is_empty() {
                    writeln!( self.out, "{}", text )?;
                }
            }
            Ok( Reply::Quit ) => return Ok( false ),
            Err( e ) => writeln!( self.out, "Error: {}", e )?,
        }
        self.out.flush()?;
        Ok( true )
    }


    /// Runs until stdin closes, `quit` is entered, or Ctrl-C.
    ///
    /// @param interactive - Read commands from stdin; otherwise only wait
    ///                      for Ctrl-C
    pub async fn run( &mut self, interactive: bool ) -> Result<()> {
        let mut lines = BufReader::new( tokio::io::stdin() ).lines();
        let mut stdin_open = interactive;
        let mut poll = tokio::time::interval( METADATA_POLL );

        loop {
            let deadline = self.autosave.deadline();
            let wake = tokio::time::Instant::from_std( deadline.unwrap_or_else( Instant::now ) );

            tokio::select! {
                line = lines.next_line(), if stdin_open => {
                    match line? {
                        Some( line ) => {
                            if !self.handle_line( &line )? {
                                break;
                            }
                        }
                        None => {
                            tracing::debug!( "Console input closed" );
                            stdin_open = false;
                            if interactive {
                                break;
                            }
                        }
                    }
                }
                _ = tokio::time::sleep_until( wake ), if deadline.is_some() => {
                    self.autosave.flush( self.ctx.stations_mut() );
                }
                _ = poll.tick() => {
                    self.ctx.refresh_stream_info();
                    self.autosave.observe( self.ctx.stations(), Instant::now() );
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!( "Interrupted" );
                    break;
                }
            }
        }

        Ok(())
    }


    /// Stops everything, writes pending changes and hands the context back.
    pub fn finish( mut self ) -> AppContext {
        self.ctx.shutdown();
        self.autosave.flush( self.ctx.stations_mut() );
        self.ctx
    }
}


#[cfg( test )]
mod tests {
    use radioxide_core::{ PlaybackState, Station };

    use super::*;
    use crate::backend::DryRunBackend;


    fn shell( output: &std::path::Path ) -> Shell<Vec<u8>> {
        let mut list = StationList::new( "/dev/null", output );
        list.load().unwrap();
        let ctx = AppContext::new( list, Box::new( DryRunBackend::new() ) );
        Shell::new( ctx, Duration::from_millis( 500 ), Vec::new() )
    }


    fn output( shell: &Shell<Vec<u8>> ) -> String {
        String::from_utf8( shell.out.clone() ).unwrap()
    }


    #[test]
    fn test_autosave_debounces() {
        let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
        let mut autosave = Autosave::new( Duration::from_secs( 1 ), &list );
        let start = Instant::now();

        autosave.observe( &list, start );
        assert_eq!( autosave.deadline(), None );

        list.append( Station::new( None, "http://foo.org" ).unwrap() ).unwrap();
        autosave.observe( &list, start );
        assert_eq!( autosave.deadline(), Some( start + Duration::from_secs( 1 ) ) );

        // Looking again without a new change keeps the deadline
        autosave.observe( &list, start + Duration::from_millis( 300 ) );
        assert_eq!( autosave.deadline(), Some( start + Duration::from_secs( 1 ) ) );

        list.append( Station::new( None, "http://bar.com" ).unwrap() ).unwrap();
        autosave.observe( &list, start + Duration::from_millis( 600 ) );
        assert_eq!( autosave.deadline(), Some( start + Duration::from_millis( 1600 ) ) );
    }


    #[test]
    fn test_flush_clears_pending_even_on_failure() {
        let mut list = StationList::new( "/dev/null", "/dev/null/stations.xml" );
        let mut autosave = Autosave::new( Duration::from_secs( 1 ), &list );
        list.append( Station::new( None, "http://foo.org" ).unwrap() ).unwrap();
        autosave.observe( &list, Instant::now() );

        autosave.flush( &mut list );
        assert_eq!( autosave.deadline(), None );
        assert!( !list.is_save_pending() );
    }


    #[test]
    fn test_commands_write_replies() {
        let tmp = tempfile::tempdir().unwrap();
        let mut shell = shell( &tmp.path().join( "stations.xml" ) );

        assert!( shell.handle_line( "add http://foo.org Foo" ).unwrap() );
        assert!( shell.handle_line( "   " ).unwrap() );
        assert!( shell.handle_line( "remove nothing" ).unwrap() );
        assert!( shell.handle_line( "play" ).unwrap() );
        assert!( !shell.handle_line( "quit" ).unwrap() );

        assert_eq!( output( &shell ), "Added 'Foo' at 0\nError: Not found: nothing\nPlaying 'Foo' at 0\n" );
        assert_eq!( shell.context().playback_state(), PlaybackState::Playing );
        assert!( shell.autosave.deadline().is_some() );
    }


    #[test]
    fn test_finish_saves_pending_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "stations.xml" );
        let mut shell = shell( &path );

        shell.handle_line( "add http://foo.org Foo" ).unwrap();
        shell.handle_line( "play Foo" ).unwrap();
        let ctx = shell.finish();

        assert_eq!( ctx.playback_state(), PlaybackState::Stopped );
        assert!( std::fs::read_to_string( &path ).unwrap().contains( "<name>Foo</name>" ) );
    }
}
