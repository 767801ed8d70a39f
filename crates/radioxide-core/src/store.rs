//! File access for the station list
//!
//! Reads treat a missing file as empty. Writes go to a temporary file in
//! the target's directory which is then renamed over the target, so the
//! file is never observed half-written. Symlinks are followed, so the link
//! itself survives and its target gets the new content.

use std::fs;
use std::io::{ ErrorKind, Write };
use std::path::{ Path, PathBuf };

use tempfile::NamedTempFile;

use crate::error::StationListError;
use crate::xml::{ self, StationRecord };


/// Upper bound on symlink hops before giving up.
const MAX_LINK_DEPTH: usize = 32;


/// Reads station records from `path`.
///
/// A missing or empty file yields no records.
pub fn read_records( path: &Path ) -> Result<Vec<StationRecord>, StationListError> {
    let text = match fs::read_to_string( path ) {
        Ok( text ) => text,
        Err( e ) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!( "Station file {:?} does not exist", path );
            return Ok( Vec::new() );
        }
        Err( e ) if e.kind() == ErrorKind::InvalidData => {
            return Err( StationListError::parse( xml::ROOT, format!( "{:?} is not valid UTF-8", path ) ) );
        }
        Err( e ) => return Err( StationListError::io( path, e ) ),
    };

    xml::parse( &text )
}


/// Serializes `records` and atomically replaces the file at `path`.
pub fn write_records( path: &Path, records: &[StationRecord] ) -> Result<(), StationListError> {
    write_atomic( path, &xml::serialize( records ) )
}


/// Atomically replaces the content of `path`, writing through symlinks.
pub fn write_atomic( path: &Path, content: &str ) -> Result<(), StationListError> {
    let target = resolve_links( path )?;
    let dir = match target.parent() {
        Some( parent ) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from( "." ),
    };

    fs::create_dir_all( &dir ).map_err( |e| StationListError::io( &dir, e ) )?;

    let mut tmp = NamedTempFile::new_in( &dir ).map_err( |e| StationListError::io( &dir, e ) )?;
    tmp.write_all( content.as_bytes() ).map_err( |e| StationListError::io( tmp.path(), e ) )?;
    tmp.as_file().sync_all().map_err( |e| StationListError::io( tmp.path(), e ) )?;

    // Keep the permissions of the file being replaced
    if let Ok( meta ) = fs::metadata( &target ) {
        if let Err( e ) = tmp.as_file().set_permissions( meta.permissions() ) {
            tracing::warn!( "Failed to copy permissions onto {:?}: {}", tmp.path(), e );
        }
    }

    tmp.persist( &target ).map_err( |e| StationListError::io( &target, e.error ) )?;
    tracing::debug!( "Wrote {} bytes to {:?}", content.len(), target );
    Ok(())
}


/// Follows a chain of symlinks down to the final path, which may not exist yet.
fn resolve_links( path: &Path ) -> Result<PathBuf, StationListError> {
    let mut current = path.to_path_buf();

    for _ in 0..MAX_LINK_DEPTH {
        match fs::symlink_metadata( &current ) {
            Ok( meta ) if meta.file_type().is_symlink() => {
                let link = fs::read_link( &current ).map_err( |e| StationListError::io( &current, e ) )?;
                current = if link.is_absolute() {
                    link
                } else {
                    current.parent().map( |p| p.join( &link ) ).unwrap_or( link )
                };
            }
            _ => return Ok( current ),
        }
    }

    Err( StationListError::io(
        path,
        std::io::Error::new( ErrorKind::Other, "too many levels of symbolic links" ),
    ))
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_missing_file_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!( read_records( &tmp.path().join( "nope.xml" ) ).unwrap().is_empty() );
    }


    #[test]
    fn test_write_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "a" ).join( "b" ).join( "stations.xml" );
        write_atomic( &path, "<Stations>\n</Stations>" ).unwrap();
        assert_eq!( fs::read_to_string( &path ).unwrap(), "<Stations>\n</Stations>" );
    }


    #[test]
    fn test_write_replaces_content_without_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "stations.xml" );
        write_atomic( &path, "first" ).unwrap();
        write_atomic( &path, "second" ).unwrap();

        assert_eq!( fs::read_to_string( &path ).unwrap(), "second" );
        assert_eq!( fs::read_dir( tmp.path() ).unwrap().count(), 1 );
    }


    #[cfg( unix )]
    #[test]
    fn test_write_goes_through_relative_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join( "real.xml" );
        let link = tmp.path().join( "link.xml" );
        fs::write( &real, "old" ).unwrap();
        std::os::unix::fs::symlink( "real.xml", &link ).unwrap();

        write_atomic( &link, "new" ).unwrap();

        assert!( fs::symlink_metadata( &link ).unwrap().file_type().is_symlink() );
        assert_eq!( fs::read_to_string( &real ).unwrap(), "new" );
    }


    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "stations.xml" );
        fs::write( &path, "<Stations><Station>" ).unwrap();
        assert!( matches!( read_records( &path ), Err( StationListError::Parse { .. } ) ) );
    }


    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join( "stations.xml" );
        fs::write( &path, b"<Stations><Station><uri>http://\xff\xfe</uri></Station></Stations>" ).unwrap();
        assert!( matches!( read_records( &path ), Err( StationListError::Parse { .. } ) ) );
    }
}
