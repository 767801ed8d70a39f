//! Optional subsystems
//!
//! A feature is a named component tagged with the capabilities it provides.
//! The registry drives each one through a two-state machine: enabling an
//! enabled feature or disabling a disabled one does nothing.

use thiserror::Error;

use crate::context::AppContext;


/// Errors from the feature registry.
#[derive( Debug, Error, PartialEq, Eq )]
pub enum FeatureError {
    #[error( "Unknown feature: {0}" )]
    Unknown( String ),

    #[error( "Feature already registered: {0}" )]
    AlreadyRegistered( String ),
}


/// What a feature contributes to the application.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Capability {
    /// Reports list and playback changes to the user
    Notifications,
    /// Accepts commands from outside the main loop
    RemoteControl,
    /// Prevents system sleep while playing
    Inhibitor,
    /// Global keyboard shortcuts
    Hotkeys,
}


#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum FeatureState {
    #[default]
    Disabled,
    Enabled,
}


/// An optional subsystem.
pub trait Feature {
    /// Unique, stable name.
    fn name( &self ) -> &'static str;

    fn capabilities( &self ) -> &'static [Capability];

    /// Called once per transition to `Enabled`.
    fn enable( &mut self, ctx: &mut AppContext );

    /// Called once per transition to `Disabled`.
    fn disable( &mut self, ctx: &mut AppContext );
}


struct Entry {
    feature: Box<dyn Feature>,
    state: FeatureState,
}


/// Registered features, in registration order.
#[derive( Default )]
pub struct FeatureRegistry {
    entries: Vec<Entry>,
}


impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }


    /// Adds a feature in the `Disabled` state.
    pub fn register( &mut self, feature: Box<dyn Feature> ) -> Result<(), FeatureError> {
        let name = feature.name();
        if self.find( name ).is_some() {
            return Err( FeatureError::AlreadyRegistered( name.to_string() ) );
        }
        tracing::debug!( "Registered feature '{}'", name );
        self.entries.push( Entry { feature, state: FeatureState::Disabled } );
        Ok(())
    }


    pub fn state( &self, name: &str ) -> Option<FeatureState> {
        self.find( name ).map( |i| self.entries[ i ].state )
    }


    /// Feature names in registration order.
    pub fn names( &self ) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map( |e| e.feature.name() )
    }


    /// Names of the features providing `capability`.
    pub fn with_capability( &self, capability: Capability ) -> Vec<&'static str> {
        self.entries.iter()
            .filter( |e| e.feature.capabilities().contains( &capability ) )
            .map( |e| e.feature.name() )
            .collect()
    }


    /// Enables a feature.
    ///
    /// @returns `Ok(true)` if the feature changed state, `Ok(false)` if it
    ///          was already enabled
    pub fn enable( &mut self, name: &str, ctx: &mut AppContext ) -> Result<bool, FeatureError> {
        self.transition( name, FeatureState::Enabled, ctx )
    }


    /// Disables a feature. Mirror of [`FeatureRegistry::enable`].
    pub fn disable( &mut self, name: &str, ctx: &mut AppContext ) -> Result<bool, FeatureError> {
        self.transition( name, FeatureState::Disabled, ctx )
    }


    /// Disables every enabled feature, most recently registered first.
    pub fn disable_all( &mut self, ctx: &mut AppContext ) {
        for entry in self.entries.iter_mut().rev() {
            if entry.state == FeatureState::Enabled {
                entry.feature.disable( ctx );
                entry.state = FeatureState::Disabled;
                tracing::info!( "Disabled feature '{}'", entry.feature.name() );
            }
        }
    }


    fn transition(
        &mut self,
        name: &str,
        target: FeatureState,
        ctx: &mut AppContext,
    ) -> Result<bool, FeatureError> {
        let index = self.find( name ).ok_or_else( || FeatureError::Unknown( name.to_string() ) )?;
        let entry = &mut self.entries[ index ];
        if entry.state == target {
            return Ok( false );
        }

        match target {
            FeatureState::Enabled => entry.feature.enable( ctx ),
            FeatureState::Disabled => entry.feature.disable( ctx ),
        }
        entry.state = target;
        tracing::info!( "Feature '{}' is now {:?}", name, target );
        Ok( true )
    }


    fn find( &self, name: &str ) -> Option<usize> {
        self.entries.iter().position( |e| e.feature.name() == name )
    }
}


#[cfg( test )]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::context::tests::test_context;


    struct Recorder {
        calls: Rc<RefCell<Vec<&'static str>>>,
    }


    impl Feature for Recorder {
        fn name( &self ) -> &'static str {
            "recorder"
        }

        fn capabilities( &self ) -> &'static [Capability] {
            &[ Capability::Notifications ]
        }

        fn enable( &mut self, _ctx: &mut AppContext ) {
            self.calls.borrow_mut().push( "enable" );
        }

        fn disable( &mut self, _ctx: &mut AppContext ) {
            self.calls.borrow_mut().push( "disable" );
        }
    }


    fn registry() -> ( FeatureRegistry, Rc<RefCell<Vec<&'static str>>> ) {
        let calls = Rc::new( RefCell::new( Vec::new() ) );
        let mut registry = FeatureRegistry::new();
        registry.register( Box::new( Recorder { calls: Rc::clone( &calls ) } ) ).unwrap();
        ( registry, calls )
    }


    #[test]
    fn test_transitions_are_idempotent() {
        let ( mut registry, calls ) = registry();
        let mut ctx = test_context();

        assert_eq!( registry.state( "recorder" ), Some( FeatureState::Disabled ) );
        assert!( !registry.disable( "recorder", &mut ctx ).unwrap() );
        assert!( registry.enable( "recorder", &mut ctx ).unwrap() );
        assert!( !registry.enable( "recorder", &mut ctx ).unwrap() );
        assert_eq!( registry.state( "recorder" ), Some( FeatureState::Enabled ) );
        assert!( registry.disable( "recorder", &mut ctx ).unwrap() );

        assert_eq!( *calls.borrow(), [ "enable", "disable" ] );
    }


    #[test]
    fn test_unknown_and_duplicate_features() {
        let ( mut registry, calls ) = registry();
        let mut ctx = test_context();

        assert_eq!( registry.enable( "nope", &mut ctx ), Err( FeatureError::Unknown( "nope".into() ) ) );
        assert_eq!(
            registry.register( Box::new( Recorder { calls } ) ),
            Err( FeatureError::AlreadyRegistered( "recorder".into() ) )
        );
        assert_eq!( registry.names().collect::<Vec<_>>(), [ "recorder" ] );
    }


    #[test]
    fn test_capability_lookup_and_disable_all() {
        let ( mut registry, calls ) = registry();
        let mut ctx = test_context();

        assert_eq!( registry.with_capability( Capability::Notifications ), [ "recorder" ] );
        assert!( registry.with_capability( Capability::Hotkeys ).is_empty() );

        registry.enable( "recorder", &mut ctx ).unwrap();
        registry.disable_all( &mut ctx );
        registry.disable_all( &mut ctx );
        assert_eq!( *calls.borrow(), [ "enable", "disable" ] );
    }
}
