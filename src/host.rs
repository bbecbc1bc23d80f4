use std::collections::BTreeMap ;
use std::sync::Arc ;
use thiserror::Error ;
use wasmtime::Engine ;

use crate::identity::{ IdentityError, IdentityName };
use crate::loader::ResolveError ;
use crate::unit::{ LinkageError, LoadedUnit, UnitOrigin };



/// Errors that can occur while defining host units.
#[derive( Debug, Error )]
pub enum HostDefinitionError {
	/// The name is not a valid identity.
	#[error( "Invalid host unit name: {0}" )]
	InvalidName( #[from] IdentityError ),
	/// A unit of that name was already defined.
	#[error( "Host unit '{0}' is already defined" )]
	Duplicate( IdentityName ),
	/// The unit's bytes could not be materialised.
	#[error( "Failed to define host unit: {0}" )]
	Linkage( #[from] LinkageError ),
}

/// The pre-existing units of the host, consulted by a [`ModuleLoader`]( crate::ModuleLoader )
/// only for names none of its containers supply.
///
/// A host namespace is built once and never changes afterwards; it outlives
/// every build generation that falls back to it.
#[derive( Debug, Default )]
pub struct HostNamespace {
	units: BTreeMap<IdentityName, Arc<LoadedUnit>>,
}

impl HostNamespace {

	/// A namespace with no units; every fallback lookup comes up empty.
	pub fn empty() -> Self { Self::default() }

	/// Starts defining host units compiled with `engine`.
	pub fn builder( engine: &Engine ) -> HostNamespaceBuilder {
		HostNamespaceBuilder { engine: engine.clone(), units: BTreeMap::new() }
	}

	/// The host unit named `name`, if defined.
	pub fn lookup( &self, name: &str ) -> Option<Arc<LoadedUnit>> {
		self.units.get( name ).cloned()
	}

	/// All host units, ordered by name.
	pub fn units( &self ) -> impl Iterator<Item = &Arc<LoadedUnit>> { self.units.values() }

	/// Number of host units.
	#[inline] pub fn len( &self ) -> usize { self.units.len() }

	/// Whether the namespace defines no units.
	#[inline] pub fn is_empty( &self ) -> bool { self.units.is_empty() }

}

/// Builder for a [`HostNamespace`].
///
/// Each definition is linked against the definitions before it, so supertypes and
/// imported units must be defined first.
#[must_use = "call .build() to obtain the HostNamespace"]
pub struct HostNamespaceBuilder {
	engine: Engine,
	units: BTreeMap<IdentityName, Arc<LoadedUnit>>,
}

impl HostNamespaceBuilder {

	/// Defines a host unit from WebAssembly bytes (binary or text format).
	///
	/// # Errors
	/// Fails if the name is invalid or taken, or the unit cannot be materialised
	/// against the units defined so far.
	pub fn define( mut self, name: &str, bytes: impl AsRef<[u8]> ) -> Result<Self, HostDefinitionError> {

		let name = IdentityName::new( name )?;
		if self.units.contains_key( &name ) { return Err( HostDefinitionError::Duplicate( name ))}

		let unit = LoadedUnit::materialise(
			name.clone(),
			bytes.as_ref(),
			UnitOrigin::Host,
			&self.engine,
			| dependency | self.units.get( dependency ).cloned().ok_or_else(|| ResolveError::NotFound( dependency.clone() )),
		)?;

		self.units.insert( name, Arc::new( unit ));
		Ok( self )

	}

	/// Finishes the namespace.
	pub fn build( self ) -> HostNamespace {
		HostNamespace { units: self.units }
	}

}

impl std::fmt::Debug for HostNamespaceBuilder {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "HostNamespaceBuilder" )
			.field( "units", &self.units.keys().collect::<Vec<_>>() )
			.finish_non_exhaustive()
	}
}
