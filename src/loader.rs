//! Name resolution over an ordered list of containers with a host fallback.
//!
//! A [`ModuleLoader`] resolves an [`IdentityName`] to a [`LoadedUnit`] with a fixed precedence:
//!
//! 1. Names already classified in this loader are answered from that classification:
//! 	resolved names return the registered unit, unresolvable names go straight
//! 	to the host namespace without touching any container.
//! 2. Otherwise the containers are asked in construction order; the first one holding
//! 	the unit's artifact wins, the unit is materialised, registered and returned.
//! 3. If no container holds it, the name is classified unresolvable and the
//! 	[`HostNamespace`] answers (or [`ResolveError::NotFound`] if it can't).
//!
//! Freshly compiled units therefore always shadow same-named host units. Classifications
//! are never revised: a loader is one build generation, and the only way to reclassify
//! a name is to build a new loader.

use std::collections::{ BTreeSet, HashMap, HashSet };
use std::path::Path ;
use std::sync::{ Arc, Mutex };
use itertools::Itertools ;
use thiserror::Error ;
use wasmtime::Engine ;

use crate::container::{ Container, ContainerError, open_container };
use crate::host::HostNamespace ;
use crate::identity::IdentityName ;
use crate::unit::{ LinkageError, LoadedUnit, UnitOrigin };
use crate::utils::PartialSuccess ;



/// Default extension of compiled artifacts inside containers.
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "wasm" ;

/// Errors that can occur while resolving a name.
#[derive( Debug, Error )]
pub enum ResolveError {
	/// Neither a container nor the host namespace supplies the name.
	#[error( "Not found: {0}" )]
	NotFound( IdentityName ),
	/// The unit's bytes were found but could not be materialised.
	#[error( "Linkage failure: {0}" )]
	Linkage( #[from] LinkageError ),
	/// A container failed to read (as opposed to not holding the unit).
	#[error( "Container error: {0}" )]
	Container( #[from] ContainerError ),
	/// Failed to acquire the loader state lock.
	#[error( "Lock Rejected" )]
	LockRejected,
}

/// How a loader has classified a name so far.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Classification {
	/// Supplied by one of the loader's containers.
	Resolved,
	/// No container supplies it; lookups go to the host namespace.
	Unresolvable,
}

/// Lookup counters, mainly useful to observe cache behaviour.
#[derive( Debug, Clone, Copy, Default, PartialEq, Eq )]
pub struct LoaderStats {
	/// Resolutions that had to walk the container list.
	pub container_scans: usize,
	/// Individual [`Container::lookup`] calls made.
	pub container_lookups: usize,
	/// Resolutions answered from an existing classification.
	pub cache_hits: usize,
	/// Resolutions delegated to the host namespace after a scan came up empty.
	pub host_fallbacks: usize,
}

#[derive( Default )]
struct LoaderState {
	resolved: HashMap<IdentityName, Arc<LoadedUnit>>,
	unresolvable: HashSet<IdentityName>,
	linking: Vec<IdentityName>,
	stats: LoaderStats,
}

/// One generation of name resolution: an ordered container list, the host
/// namespace fallback, and the classification caches.
///
/// Containers are owned exclusively by the loader and released when it is dropped.
pub struct ModuleLoader {
	engine: Engine,
	containers: Vec<Box<dyn Container>>,
	host: Arc<HostNamespace>,
	artifact_extension: String,
	state: Mutex<LoaderState>,
}

impl ModuleLoader {

	/// Creates a loader over already opened containers, asked in the given order.
	pub fn new(
		engine: &Engine,
		containers: impl IntoIterator<Item = Box<dyn Container>>,
		host: Arc<HostNamespace>,
	) -> Self {
		Self {
			engine: engine.clone(),
			containers: containers.into_iter().collect(),
			host,
			artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
			state: Mutex::new( LoaderState::default() ),
		}
	}

	/// Opens a container for every root (see [`open_container`]) and creates a loader over them.
	///
	/// Roots that cannot be opened are skipped and reported as warnings; the loader
	/// is then simply shorter. Containers opened before a failing root stay owned by
	/// the loader, so nothing leaks either way.
	pub fn from_roots(
		engine: &Engine,
		roots: impl IntoIterator<Item = impl AsRef<Path>>,
		host: Arc<HostNamespace>,
	) -> PartialSuccess<Self, ContainerError> {

		let ( containers, warnings ): ( Vec<_>, Vec<_> ) = roots.into_iter()
			.map(| root | open_container( root.as_ref() ))
			.partition_result();
		warnings.iter().for_each(| err | tracing::warn!( "Skipping container: {}", err ));

		( Self::new( engine, containers, host ), warnings )

	}

	/// Sets the extension artifacts carry inside containers (default [`DEFAULT_ARTIFACT_EXTENSION`]).
	pub fn with_artifact_extension( mut self, extension: impl Into<String> ) -> Self {
		self.artifact_extension = extension.into();
		self
	}

	/// Resolves `name` following the loader's precedence rules.
	///
	/// # Errors
	/// [`ResolveError::NotFound`] if nothing supplies the name, [`ResolveError::Linkage`]
	/// if a container supplies bytes that cannot be materialised, and
	/// [`ResolveError::Container`] if a container fails to read.
	pub fn resolve( &self, name: &IdentityName ) -> Result<Arc<LoadedUnit>, ResolveError> {
		let mut state = self.state.lock().map_err(|_| ResolveError::LockRejected )?;
		state.linking.clear();
		self.resolve_in( &mut state, name )
	}

	/// A unit already registered by this loader, without triggering any lookup.
	pub fn registered( &self, name: &str ) -> Option<Arc<LoadedUnit>> {
		self.state.lock().ok()?.resolved.get( name ).cloned()
	}

	/// All units registered so far, in no particular order.
	pub fn registered_units( &self ) -> Vec<Arc<LoadedUnit>> {
		self.state.lock()
			.map(| state | state.resolved.values().cloned().collect() )
			.unwrap_or_default()
	}

	/// How `name` has been classified so far, if at all.
	pub fn classification( &self, name: &str ) -> Option<Classification> {
		let state = self.state.lock().ok()?;
		match ( state.resolved.contains_key( name ), state.unresolvable.contains( name )) {
			( true, _ ) => Some( Classification::Resolved ),
			( false, true ) => Some( Classification::Unresolvable ),
			( false, false ) => None,
		}
	}

	/// Identities of every artifact the containers list, ordered by name.
	///
	/// Resources without the artifact extension, or whose name doesn't map back
	/// to exactly that resource, are ignored. Containers that fail to list their
	/// contents are left out and reported.
	pub fn available_identities( &self ) -> PartialSuccess<BTreeSet<IdentityName>, ContainerError> {

		let suffix = format!( ".{}", self.artifact_extension );
		let ( listings, errors ): ( Vec<_>, Vec<_> ) = self.containers.iter()
			.map(| container | container.resources() )
			.partition_result();

		let identities = listings.into_iter()
			.flatten()
			.filter_map(| resource | {
				let identity = IdentityName::new( resource.strip_suffix( suffix.as_str() )?.replace( '/', "." )).ok()?;
				( identity.resource_name( &self.artifact_extension ) == resource ).then_some( identity )
			})
			.collect();

		( identities, errors )

	}

	/// Snapshot of the lookup counters.
	pub fn stats( &self ) -> LoaderStats {
		self.state.lock().map(| state | state.stats ).unwrap_or_default()
	}

	/// Roots of the containers, in lookup order.
	pub fn container_roots( &self ) -> impl Iterator<Item = &Path> {
		self.containers.iter().map(| container | container.root() )
	}

	/// The engine units are compiled with.
	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }

	/// The host namespace consulted for names no container supplies.
	#[inline] pub fn host( &self ) -> &Arc<HostNamespace> { &self.host }

	/// Extension artifacts carry inside containers.
	#[inline] pub fn artifact_extension( &self ) -> &str { &self.artifact_extension }

	fn resolve_in( &self, state: &mut LoaderState, name: &IdentityName ) -> Result<Arc<LoadedUnit>, ResolveError> {

		if let Some( unit ) = state.resolved.get( name ) {
			state.stats.cache_hits += 1 ;
			return Ok( Arc::clone( unit ));
		}

		if state.unresolvable.contains( name ) {
			state.stats.cache_hits += 1 ;
			return self.host.lookup( name.as_str() ).ok_or_else(|| ResolveError::NotFound( name.clone() ));
		}

		if state.linking.contains( name ) {
			let mut chain = state.linking.clone();
			chain.push( name.clone() );
			return Err( LinkageError::LoopDetected( chain ).into() );
		}

		state.stats.container_scans += 1 ;
		let Some(( bytes, root )) = self.scan( state, name )? else {
			tracing::debug!( identity = %name, "No container supplies unit, delegating to host namespace" );
			state.stats.host_fallbacks += 1 ;
			state.unresolvable.insert( name.clone() );
			return self.host.lookup( name.as_str() ).ok_or_else(|| ResolveError::NotFound( name.clone() ));
		};

		state.linking.push( name.clone() );
		let unit = LoadedUnit::materialise(
			name.clone(),
			&bytes,
			UnitOrigin::Container( root.to_path_buf() ),
			&self.engine,
			| dependency | self.resolve_in( &mut *state, dependency ),
		);
		state.linking.pop();

		let unit = Arc::new( unit? );
		tracing::debug!( identity = %name, container = %root.display(), "Registered unit" );
		state.resolved.insert( name.clone(), Arc::clone( &unit ));
		Ok( unit )

	}

	fn scan( &self, state: &mut LoaderState, name: &IdentityName ) -> Result<Option<( Vec<u8>, &Path )>, ContainerError> {
		let resource_name = name.resource_name( &self.artifact_extension );
		for container in &self.containers {
			state.stats.container_lookups += 1 ;
			if let Some( bytes ) = container.lookup( &resource_name )? {
				return Ok( Some(( bytes, container.root() )));
			}
		}
		Ok( None )
	}

}

impl std::fmt::Debug for ModuleLoader {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ModuleLoader" )
			.field( "containers", &self.containers )
			.field( "host", &self.host )
			.field( "artifact_extension", &self.artifact_extension )
			.finish_non_exhaustive()
	}
}
