//! Playback backend used when no streaming engine is linked in.
//!
//! Tracks the playback state and logs what would be streamed.

use radioxide_core::{ PlaybackBackend, PlaybackError, PlaybackState };


#[derive( Debug, Default )]
pub struct DryRunBackend {
    uri: Option<String>,
}


impl DryRunBackend {
    pub fn new() -> Self {
        Self::default()
    }


    /// URI of the stream currently "playing".
    #[cfg( test )]
    pub fn uri( &self ) -> Option<&str> {
        self.uri.as_deref()
    }
}


impl PlaybackBackend for DryRunBackend {
    fn play( &mut self, uri: &str, user_agent: Option<&str> ) -> Result<(), PlaybackError> {
        if uri.trim().is_empty() {
            return Err( PlaybackError::Backend( "empty stream URI".into() ) );
        }
        match user_agent {
            Some( ua ) => tracing::info!( "Streaming {} as '{}'", uri, ua ),
            None => tracing::info!( "Streaming {}", uri ),
        }
        self.uri = Some( uri.to_string() );
        Ok(())
    }


    fn stop( &mut self ) {
        if let Some( uri ) = self.uri.take() {
            tracing::info!( "Stopped streaming {}", uri );
        }
    }


    fn state( &self ) -> PlaybackState {
        if self.uri.is_some() { PlaybackState::Playing } else { PlaybackState::Stopped }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_state_follows_play_and_stop() {
        let mut backend = DryRunBackend::new();
        assert_eq!( backend.state(), PlaybackState::Stopped );

        backend.play( "http://foo.org", None ).unwrap();
        assert_eq!( backend.state(), PlaybackState::Playing );
        assert_eq!( backend.uri(), Some( "http://foo.org" ) );

        backend.stop();
        backend.stop();
        assert_eq!( backend.state(), PlaybackState::Stopped );
        assert!( backend.play( " ", None ).is_err() );
    }
}
