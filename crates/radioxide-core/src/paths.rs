//! File location resolution
//!
//! Follows the XDG base directory search order: user data, user config,
//! then the system data and config directories.

use std::env;
use std::path::{ Path, PathBuf };


/// Directory name used under every base directory.
pub const APP_DIR: &str = "radioxide";

/// Station list file name.
pub const STATIONS_FILE: &str = "stations.xml";


const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";
const DEFAULT_CONFIG_DIRS: &str = "/etc/xdg";


/// Resolved base directories.
#[derive( Debug, Clone, Default, PartialEq, Eq )]
pub struct XdgDirs {
    pub data_home: Option<PathBuf>,
    pub config_home: Option<PathBuf>,
    pub data_dirs: Vec<PathBuf>,
    pub config_dirs: Vec<PathBuf>,
}


impl XdgDirs {
    /// Reads the base directories from the environment.
    pub fn from_env() -> Self {
        Self {
            data_home: dirs::data_dir(),
            config_home: dirs::config_dir(),
            data_dirs: split_dirs( env::var( "XDG_DATA_DIRS" ).ok().as_deref(), DEFAULT_DATA_DIRS ),
            config_dirs: split_dirs( env::var( "XDG_CONFIG_DIRS" ).ok().as_deref(), DEFAULT_CONFIG_DIRS ),
        }
    }


    /// Returns every candidate location for `file`, most specific first.
    pub fn search_paths( &self, file: &str ) -> Vec<PathBuf> {
        self.data_home.iter()
            .chain( self.config_home.iter() )
            .chain( self.data_dirs.iter() )
            .chain( self.config_dirs.iter() )
            .map( |dir| dir.join( APP_DIR ).join( file ) )
            .collect()
    }


    /// Returns the first existing candidate location for `file`.
    pub fn find( &self, file: &str ) -> Option<PathBuf> {
        let found = self.search_paths( file ).into_iter().find( |p| p.is_file() );
        match &found {
            Some( path ) => tracing::debug!( "Found {} at {:?}", file, path ),
            None => tracing::debug!( "No {} found in search paths", file ),
        }
        found
    }


    /// Returns where new saves of `file` go: the user data directory.
    pub fn output_path( &self, file: &str ) -> Option<PathBuf> {
        self.data_home.as_ref().map( |dir| dir.join( APP_DIR ).join( file ) )
    }
}


/// Splits a colon-separated directory list, ignoring relative entries.
fn split_dirs( value: Option<&str>, default: &str ) -> Vec<PathBuf> {
    let value = match value {
        Some( v ) if !v.trim().is_empty() => v,
        _ => default,
    };

    value.split( ':' )
        .map( Path::new )
        .filter( |p| p.is_absolute() )
        .map( Path::to_path_buf )
        .collect()
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_split_dirs_defaults_and_filters() {
        assert_eq!(
            split_dirs( None, DEFAULT_DATA_DIRS ),
            vec![ PathBuf::from( "/usr/local/share" ), PathBuf::from( "/usr/share" ) ]
        );
        assert_eq!(
            split_dirs( Some( "/opt/share:relative::/srv" ), DEFAULT_DATA_DIRS ),
            vec![ PathBuf::from( "/opt/share" ), PathBuf::from( "/srv" ) ]
        );
    }


    #[test]
    fn test_search_order() {
        let dirs = XdgDirs {
            data_home: Some( PathBuf::from( "/home/u/.local/share" ) ),
            config_home: Some( PathBuf::from( "/home/u/.config" ) ),
            data_dirs: vec![ PathBuf::from( "/usr/share" ) ],
            config_dirs: vec![ PathBuf::from( "/etc/xdg" ) ],
        };

        assert_eq!( dirs.search_paths( STATIONS_FILE ), vec![
            PathBuf::from( "/home/u/.local/share/radioxide/stations.xml" ),
            PathBuf::from( "/home/u/.config/radioxide/stations.xml" ),
            PathBuf::from( "/usr/share/radioxide/stations.xml" ),
            PathBuf::from( "/etc/xdg/radioxide/stations.xml" ),
        ]);
        assert_eq!(
            dirs.output_path( STATIONS_FILE ),
            Some( PathBuf::from( "/home/u/.local/share/radioxide/stations.xml" ) )
        );
    }


    #[test]
    fn test_find_picks_first_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join( "data" );
        let config = tmp.path().join( "config" );
        std::fs::create_dir_all( config.join( APP_DIR ) ).unwrap();
        std::fs::write( config.join( APP_DIR ).join( STATIONS_FILE ), "<Stations/>" ).unwrap();

        let dirs = XdgDirs {
            data_home: Some( data ),
            config_home: Some( config.clone() ),
            data_dirs: Vec::new(),
            config_dirs: Vec::new(),
        };

        assert_eq!( dirs.find( STATIONS_FILE ), Some( config.join( APP_DIR ).join( STATIONS_FILE ) ) );
        assert_eq!( dirs.find( "missing.xml" ), None );
    }
}
