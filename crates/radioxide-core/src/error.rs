//! Error taxonomy for station list operations.

use std::path::PathBuf;

use thiserror::Error;


/// Errors that can occur with station list operations.
#[derive( Debug, Error )]
pub enum StationListError {
    #[error( "Invalid argument: {0}" )]
    InvalidArgument( String ),

    #[error( "Station {0} is already in the list" )]
    DuplicateIdentifier( String ),

    #[error( "Station not found: {0}" )]
    NotFound( String ),

    #[error( "Parse error in <{element}>: {message}" )]
    Parse {
        element: String,
        message: String,
    },

    #[error( "IO error on {path}: {source}" )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}


impl StationListError {
    /// Builds a parse error for the given element.
    pub fn parse( element: impl Into<String>, message: impl Into<String> ) -> Self {
        StationListError::Parse {
            element: element.into(),
            message: message.into(),
        }
    }


    /// Builds an IO error tagged with the path it happened on.
    pub fn io( path: impl Into<PathBuf>, source: std::io::Error ) -> Self {
        StationListError::Io {
            path: path.into(),
            source,
        }
    }
}
