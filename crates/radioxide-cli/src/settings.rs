//! Application settings management
//!
//! Handles persistent settings for startup playback, repeat and the
//! autosave delay.

use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Deserialize, Serialize };


/// Application settings.
#[derive( Debug, Clone, PartialEq, Eq, Serialize, Deserialize )]
#[serde( default )]
pub struct Settings {
    /// Resume the last station on startup
    pub autoplay: bool,

    /// Wrap around at either end of the station list
    pub repeat: bool,

    /// Print station list changes on the console
    pub console_output: bool,

    /// Quiet period before pending station list changes are written
    pub autosave_delay_ms: u64,

    /// URI of the station playing at last exit
    pub last_station: Option<String>,
}


impl Default for Settings {
    fn default() -> Self {
        Self {
            autoplay: false,
            repeat: false,
            console_output: true,
            autosave_delay_ms: 1000,
            last_station: None,
        }
    }
}


impl Settings {
    /// Returns the path to the settings file.
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map( |p| p.join( "radioxide" ).join( "settings.json" ) )
    }


    /// Loads settings from disk, or returns defaults if not found.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some( path ) => Self::load_from( &path ),
            None => Self::default(),
        }
    }


    /// Loads settings from `path`, or returns defaults if it is missing or invalid.
    pub fn load_from( path: &Path ) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string( path ) {
            Ok( contents ) => {
                serde_json::from_str( &contents ).unwrap_or_else( |e| {
                    tracing::warn!( "Ignoring invalid settings in {:?}: {}", path, e );
                    Self::default()
                })
            }
            Err( e ) => {
                tracing::warn!( "Failed to read settings: {}", e );
                Self::default()
            }
        }
    }


    /// Saves settings to disk.
    pub fn save( &self ) {
        if let Some( path ) = Self::settings_path() {
            self.save_to( &path );
        }
    }


    /// Saves settings to `path`, logging failures.
    pub fn save_to( &self, path: &Path ) {
        // Create parent directory if needed
        if let Some( parent ) = path.parent() {
            if !parent.exists() {
                if let Err( e ) = fs::create_dir_all( parent ) {
                    tracing::warn!( "Failed to create settings directory: {}", e );
                    return;
                }
            }
        }

        match serde_json::to_string_pretty( self ) {
            Ok( json ) => {
                if let Err( e ) = fs::write( path, json ) {
                    tracing::warn!( "Failed to save settings: {}", e );
                }
            }
            Err( e ) => {
                tracing::warn!( "Failed to serialize settings: {}", e );
            }
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "radioxide" ).join( "settings.json" );

        let settings = Settings {
            autoplay: true,
            last_station: Some( "http://foo.org".into() ),
            ..Settings::default()
        };
        settings.save_to( &path );

        assert_eq!( Settings::load_from( &path ), settings );
    }


    #[test]
    fn test_missing_fields_take_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "settings.json" );
        fs::write( &path, r#"{ "repeat": true }"# ).unwrap();

        let settings = Settings::load_from( &path );
        assert!( settings.repeat );
        assert_eq!( settings.autosave_delay_ms, 1000 );
        assert!( settings.console_output );
    }


    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "settings.json" );
        fs::write( &path, "not json" ).unwrap();

        assert_eq!( Settings::load_from( &path ), Settings::default() );
        assert_eq!( Settings::load_from( &tmp.path().join( "missing.json" ) ), Settings::default() );
    }
}
