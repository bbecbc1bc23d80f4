//! Capability discovery over one build generation.

use std::collections::BTreeMap ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use itertools::Itertools ;

use crate::identity::IdentityName ;
use crate::loader::ModuleLoader ;
use crate::unit::LoadedUnit ;



/// An identity available in a build generation.
///
/// Identities compiled from a source file remember that file; identities that only
/// exist in the host namespace or in a library container have none.
#[derive( Debug, Clone )]
pub struct CompiledIdentity {
	name: IdentityName,
	unit: Arc<LoadedUnit>,
	source_file: Option<PathBuf>,
}

impl CompiledIdentity {

	pub(crate) fn new( unit: Arc<LoadedUnit>, source_file: Option<PathBuf> ) -> Self {
		Self { name: unit.name().clone(), unit, source_file }
	}

	/// The identity name.
	#[inline] pub fn name( &self ) -> &IdentityName { &self.name }

	/// The loaded unit behind the identity.
	#[inline] pub fn unit( &self ) -> &Arc<LoadedUnit> { &self.unit }

	/// The source file the identity was compiled from, if any.
	#[inline] pub fn source_file( &self ) -> Option<&Path> { self.source_file.as_deref() }

}

/// Read-only index answering "which identities carry marker M" and
/// "which identities are T or a subtype of T".
///
/// Built once per successful build and never mutated; a rebuild produces a
/// new index rather than updating this one.
#[derive( Debug )]
pub struct CapabilityIndex {
	loader: Arc<ModuleLoader>,
	compiled: BTreeMap<IdentityName, CompiledIdentity>,
	foreign: BTreeMap<IdentityName, CompiledIdentity>,
}

impl CapabilityIndex {

	/// Indexes `compiled` together with every other unit reachable without a
	/// source file: the units of `loader`'s host namespace and every unit its
	/// containers hold. Units the containers list are resolved here, so queries
	/// never touch a container. Compiled and container units shadow same-named
	/// host units, even when they failed to resolve.
	pub fn new( compiled: impl IntoIterator<Item = CompiledIdentity>, loader: Arc<ModuleLoader> ) -> Self {

		let compiled = compiled.into_iter()
			.map(| identity | ( identity.name.clone(), identity ))
			.collect::<BTreeMap<_, _>>();

		let ( available, unlisted ) = loader.available_identities();
		unlisted.iter().for_each(| err | tracing::warn!( "Failed to list container: {}", err ));
		for name in available.iter().filter(| name | !compiled.contains_key( *name )) {
			if let Err( err ) = loader.resolve( name ) {
				tracing::debug!( identity = %name, "Leaving unit out of the index: {}", err );
			}
		}

		let mut foreign = loader.host().units()
			.filter(| unit | !available.contains( unit.name() ))
			.map(| unit | ( unit.name().clone(), CompiledIdentity::new( Arc::clone( unit ), None )))
			.collect::<BTreeMap<_, _>>();
		foreign.extend( loader.registered_units().into_iter()
			.map(| unit | ( unit.name().clone(), CompiledIdentity::new( unit, None )))
		);
		foreign.retain(| name, _ | !compiled.contains_key( name ));

		Self { loader, compiled, foreign }

	}

	/// Compiled identities whose unit declares `marker`, ordered by name.
	pub fn by_marker( &self, marker: &str ) -> Vec<&CompiledIdentity> {
		self.compiled.values()
			.filter(| identity | identity.unit.has_marker( marker ))
			.collect()
	}

	/// Identities that are `type_name` or one of its subtypes, ordered by name.
	///
	/// `type_name` may name any indexed identity, host and library types included;
	/// the result then includes identities without a source file. Subtyping follows
	/// the supertype units each identity actually linked against, so host units
	/// extending a host type that a compiled unit shadows are not part of the
	/// compiled type's result. Unknown names yield nothing.
	pub fn by_type( &self, type_name: &str ) -> Vec<&CompiledIdentity> {

		let Some( target ) = self.get( type_name ) else { return Vec::with_capacity( 0 )};

		self.compiled.values()
			.merge_by( self.foreign.values(), | a, b | a.name <= b.name )
			.filter(| identity | identity.unit.descends_from( &target.unit ))
			.collect()

	}

	/// The source file `identity` was compiled from. `None` for unknown identities
	/// and for identities without a source file.
	pub fn source_file_of( &self, identity: &str ) -> Option<&Path> {
		self.compiled.get( identity ).and_then( CompiledIdentity::source_file )
	}

	/// Any indexed identity by name, compiled or not.
	pub fn get( &self, identity: &str ) -> Option<&CompiledIdentity> {
		self.compiled.get( identity ).or_else(|| self.foreign.get( identity ))
	}

	/// Compiled identities, ordered by name.
	pub fn identities( &self ) -> impl Iterator<Item = &CompiledIdentity> { self.compiled.values() }

	/// Number of compiled identities.
	#[inline] pub fn len( &self ) -> usize { self.compiled.len() }

	/// Whether nothing compiled.
	#[inline] pub fn is_empty( &self ) -> bool { self.compiled.is_empty() }

	/// The loader the indexed units were resolved through.
	#[inline] pub fn loader( &self ) -> &Arc<ModuleLoader> { &self.loader }

}
