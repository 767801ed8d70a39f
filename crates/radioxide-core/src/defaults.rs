//! Stations used to populate a first-run station list.

use crate::xml::{ self, StationRecord };


const DEFAULT_STATIONS: &str = r#"<Stations>
  <Station>
    <uri>https://icecast.radiofrance.fr/fip-hifi.aac</uri>
    <name>FIP</name>
  </Station>
  <Station>
    <uri>https://ice2.somafm.com/groovesalad-128-mp3</uri>
    <name>SomaFM Groove Salad</name>
  </Station>
  <Station>
    <uri>https://ice2.somafm.com/dronezone-128-mp3</uri>
    <name>SomaFM Drone Zone</name>
  </Station>
  <Station>
    <uri>http://stream.live.vc.bbcmedia.co.uk/bbc_world_service</uri>
    <name>BBC World Service</name>
  </Station>
  <Station>
    <uri>https://npr-ice.streamguys1.com/live.mp3</uri>
    <name>NPR</name>
  </Station>
  <Station>
    <uri>https://stream.radioparadise.com/mp3-192</uri>
    <name>Radio Paradise</name>
  </Station>
</Stations>"#;


/// Returns the embedded default station set, in display order.
pub fn default_stations() -> Vec<StationRecord> {
    match xml::parse( DEFAULT_STATIONS ) {
        Ok( records ) => records,
        Err( e ) => {
            tracing::error!( "Embedded default stations are invalid: {}", e );
            Vec::new()
        }
    }
}


#[cfg( test )]
mod tests {
    use super::*;


    #[test]
    fn test_defaults_are_valid_and_named() {
        let records = default_stations();
        assert!( !records.is_empty() );
        assert!( records.iter().all( |r| r.name.is_some() && !r.uri.is_empty() ) );
    }
}
