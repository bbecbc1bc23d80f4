//! Loaded units and the metadata they carry.
//!
//! A unit is a WebAssembly core module. Besides its code it may declare:
//!
//! - **Markers**: one [`MARKER_SECTION`] custom section per marker, holding the
//! 	marker name as UTF-8 (e.g. `(@custom "hotload.marker" "Tool")` in text format).
//! - **A supertype**: a single [`EXTENDS_SECTION`] custom section holding the
//! 	identity name of the unit it is a subtype of.
//! - **Dependencies**: the module name of every import is the identity of another
//! 	unit, which must export an item of the imported name and kind.
//!
//! Both the supertype and every dependency are resolved while the unit is
//! materialised, so a [`LoadedUnit`] always carries a fully linked chain.

use std::collections::BTreeSet ;
use std::sync::Arc ;
use std::path::PathBuf ;
use itertools::Itertools ;
use thiserror::Error ;
use wasmtime::{ Engine, ExternType, Module };

use crate::identity::IdentityName ;
use crate::loader::ResolveError ;



/// Custom section declaring one marker of a unit.
pub const MARKER_SECTION: &str = "hotload.marker" ;

/// Custom section declaring the direct supertype of a unit.
pub const EXTENDS_SECTION: &str = "hotload.extends" ;

/// Where a [`LoadedUnit`] was materialised from.
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub enum UnitOrigin {
	/// Bytes served by the container opened from this path.
	Container( PathBuf ),
	/// Defined by the host before any build ran.
	Host,
}

/// Errors that occur when a unit's bytes exist but cannot be turned into a usable unit.
#[derive( Debug, Error )]
pub enum LinkageError {

	/// The bytes are not a valid WebAssembly module.
	#[error( "Malformed unit '{name}': {reason}" )]
	Malformed { name: IdentityName, reason: String },

	/// A metadata custom section is present but unusable.
	#[error( "Invalid metadata in '{name}': {reason}" )]
	InvalidMetadata { name: IdentityName, reason: String },

	/// The declared supertype could not be resolved.
	#[error( "Supertype '{supertype}' of '{name}' could not be resolved: {source}" )]
	UnresolvedSupertype { name: IdentityName, supertype: IdentityName, source: Box<ResolveError> },

	/// An import names a module that is not a valid identity.
	#[error( "Import module '{module}' of '{name}' is not a valid identity" )]
	InvalidDependency { name: IdentityName, module: String },

	/// An imported unit could not be resolved.
	#[error( "Dependency '{dependency}' of '{name}' could not be resolved: {source}" )]
	UnresolvedDependency { name: IdentityName, dependency: IdentityName, source: Box<ResolveError> },

	/// A dependency resolved but does not export an imported item, or exports it with another kind.
	#[error( "'{name}' imports '{item}' from '{dependency}', which exports no such {kind}" )]
	MissingImport { name: IdentityName, dependency: IdentityName, item: String, kind: &'static str },

	/// Resolving a supertype or dependency led back to a unit that is still being linked.
	#[error( "Loop detected linking: {}", .0.iter().join( " -> " ))]
	LoopDetected( Vec<IdentityName> ),

}

/// A validated, compiled and linked unit.
///
/// Handles are shared: the loader that materialised a unit keeps one in its
/// registry and hands out clones of the same `Arc`.
pub struct LoadedUnit {
	name: IdentityName,
	module: Module,
	markers: BTreeSet<String>,
	supertype: Option<Arc<LoadedUnit>>,
	dependencies: Vec<Arc<LoadedUnit>>,
	origin: UnitOrigin,
}

impl LoadedUnit {

	/// Validates and compiles `bytes` (binary or text format), reads its metadata and
	/// resolves its supertype and dependencies through `resolve`.
	pub(crate) fn materialise(
		name: IdentityName,
		bytes: &[u8],
		origin: UnitOrigin,
		engine: &Engine,
		mut resolve: impl FnMut( &IdentityName ) -> Result<Arc<LoadedUnit>, ResolveError>,
	) -> Result<Self, LinkageError> {

		let binary = wat::parse_bytes( bytes )
			.map_err(| err | LinkageError::Malformed { name: name.clone(), reason: err.to_string() })?;
		let UnitMetadata { markers, extends } = UnitMetadata::read( &name, &binary )?;
		let module = Module::from_binary( engine, &binary )
			.map_err(| err | LinkageError::Malformed { name: name.clone(), reason: format!( "{:#}", err ) })?;

		let supertype = extends.map(| supertype | resolve( &supertype ).map_err(| err | match err {
			ResolveError::Linkage( LinkageError::LoopDetected( chain )) => LinkageError::LoopDetected( chain ),
			err => LinkageError::UnresolvedSupertype { name: name.clone(), supertype, source: Box::new( err ) },
		})).transpose()?;

		let dependencies = module.imports()
			.map(| import | import.module().to_string() )
			.unique()
			.map(| module | IdentityName::new( module.as_str() )
				.map_err(|_| LinkageError::InvalidDependency { name: name.clone(), module })
			)
			.collect::<Result<Vec<_>, _>>()?
			.into_iter()
			.map(| dependency | resolve( &dependency ).map_err(| err | match err {
				ResolveError::Linkage( LinkageError::LoopDetected( chain )) => LinkageError::LoopDetected( chain ),
				err => LinkageError::UnresolvedDependency { name: name.clone(), dependency, source: Box::new( err ) },
			}))
			.collect::<Result<Vec<_>, _>>()?;

		module.imports().try_for_each(| import | {
			let Some( dependency ) = dependencies.iter().find(| unit | unit.name.as_str() == import.module() ) else {
				return Ok(());
			};
			let expected = import.ty();
			match dependency.module.get_export( import.name() ) {
				Some( exported ) if std::mem::discriminant( &exported ) == std::mem::discriminant( &expected ) => Ok(()),
				_ => Err( LinkageError::MissingImport {
					name: name.clone(),
					dependency: dependency.name.clone(),
					item: import.name().to_string(),
					kind: extern_kind( &expected ),
				}),
			}
		})?;

		Ok( Self { name, module, markers, supertype, dependencies, origin })

	}

	/// The identity this unit was materialised as.
	#[inline] pub fn name( &self ) -> &IdentityName { &self.name }

	/// The compiled module, ready to be instantiated by the host.
	#[inline] pub fn module( &self ) -> &Module { &self.module }

	/// Markers declared by this unit (not inherited from supertypes).
	#[inline] pub fn markers( &self ) -> &BTreeSet<String> { &self.markers }

	/// Whether this unit itself declares `marker`.
	pub fn has_marker( &self, marker: &str ) -> bool { self.markers.contains( marker ) }

	/// The direct supertype, if one was declared.
	#[inline] pub fn supertype( &self ) -> Option<&Arc<LoadedUnit>> { self.supertype.as_ref() }

	/// Units this unit imports from.
	#[inline] pub fn dependencies( &self ) -> &[Arc<LoadedUnit>] { &self.dependencies }

	/// Where the unit's bytes came from.
	#[inline] pub fn origin( &self ) -> &UnitOrigin { &self.origin }

	/// This unit followed by its supertypes, nearest first.
	pub fn lineage( &self ) -> impl Iterator<Item = &LoadedUnit> {
		std::iter::successors( Some( self ), | unit | unit.supertype.as_deref() )
	}

	/// Whether this unit or one of its (transitive) supertypes is named `ancestor`.
	pub fn is_subtype_of( &self, ancestor: &str ) -> bool {
		self.lineage().any(| unit | unit.name.as_str() == ancestor )
	}

	/// Whether `ancestor` is this very unit or one of its (transitive) supertypes.
	///
	/// Unlike [`is_subtype_of`]( Self::is_subtype_of ) this compares units, not
	/// names, so a host unit never counts as a subtype of a fresh unit that merely
	/// shadows its supertype's name.
	pub fn descends_from( &self, ancestor: &LoadedUnit ) -> bool {
		self.lineage().any(| unit | std::ptr::eq( unit, ancestor ))
	}

}

impl std::fmt::Debug for LoadedUnit {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "LoadedUnit" )
			.field( "name", &self.name )
			.field( "module", &"<Module>" )
			.field( "markers", &self.markers )
			.field( "supertype", &self.supertype.as_ref().map(| unit | unit.name() ))
			.field( "dependencies", &self.dependencies.iter().map(| unit | unit.name() ).collect::<Vec<_>>() )
			.field( "origin", &self.origin )
			.finish()
	}
}

#[derive( Default )]
struct UnitMetadata {
	markers: BTreeSet<String>,
	extends: Option<IdentityName>,
}

impl UnitMetadata {

	fn read( name: &IdentityName, binary: &[u8] ) -> Result<Self, LinkageError> {

		let mut metadata = Self::default();

		for payload in wasmparser::Parser::new( 0 ).parse_all( binary ) {
			let payload = payload.map_err(| err | LinkageError::Malformed { name: name.clone(), reason: err.to_string() })?;
			let wasmparser::Payload::CustomSection( section ) = payload else { continue };
			match section.name() {
				MARKER_SECTION => {
					metadata.markers.insert( section_text( name, MARKER_SECTION, section.data() )?.to_string() );
				}
				EXTENDS_SECTION => {
					let supertype = IdentityName::new( section_text( name, EXTENDS_SECTION, section.data() )? )
						.map_err(| err | LinkageError::InvalidMetadata { name: name.clone(), reason: err.to_string() })?;
					if metadata.extends.replace( supertype ).is_some() {
						return Err( LinkageError::InvalidMetadata {
							name: name.clone(),
							reason: format!( "more than one '{}' section", EXTENDS_SECTION ),
						});
					}
				}
				_ => {}
			}
		}

		Ok( metadata )

	}

}

fn section_text<'a>( name: &IdentityName, section: &str, data: &'a [u8] ) -> Result<&'a str, LinkageError> {
	match std::str::from_utf8( data ).map( str::trim ) {
		Ok( text ) if !text.is_empty() => Ok( text ),
		Ok( _ ) => Err( LinkageError::InvalidMetadata { name: name.clone(), reason: format!( "empty '{}' section", section ) }),
		Err( err ) => Err( LinkageError::InvalidMetadata { name: name.clone(), reason: format!( "'{}' section: {}", section, err ) }),
	}
}

fn extern_kind( ty: &ExternType ) -> &'static str {
	match ty {
		ExternType::Func( _ ) => "function",
		ExternType::Global( _ ) => "global",
		ExternType::Table( _ ) => "table",
		ExternType::Memory( _ ) => "memory",
		_ => "item",
	}
}
