//! The build: discover, compile, resolve, index.
//!
//! [`BuildPipeline::build`] always rebuilds the whole source tree into a freshly
//! cleared output root and produces a new [`Generation`] from it. Failures of
//! individual files never abort a build; they are collected in the [`BuildResult`].
//! Only failing to prepare the output root (or to read the source root at all)
//! aborts it, before anything is compiled.

use std::io::ErrorKind ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::Instant ;
use thiserror::Error ;
use wasmtime::Engine ;

use crate::compiler::{ CompileError, CompileFailure, Compiler, ExternalCompiler, Invocation };
use crate::config::{ BuildConfig, ConfigError };
use crate::container::ContainerError ;
use crate::host::HostNamespace ;
use crate::identity::IdentityName ;
use crate::index::{ CapabilityIndex, CompiledIdentity };
use crate::loader::{ ModuleLoader, ResolveError };
use crate::source::{ DiscoveryIssue, SourceUnit, discover_sources };
use crate::workspace::Generation ;



/// Errors that abort a build before any source is compiled.
#[derive( Debug, Error )]
pub enum BuildError {
	/// The output root could not be cleared or created.
	#[error( "Failed to prepare output directory '{}': {source}", path.display() )]
	OutputPreparation { path: PathBuf, source: std::io::Error },
	/// The source root could not be read.
	#[error( "Failed to read source directory '{}': {source}", path.display() )]
	SourceDiscovery { path: PathBuf, source: std::io::Error },
	/// The source root lies inside the output root, so clearing it would delete the sources.
	#[error( "Source directory '{}' lies inside output directory '{}'", source_root.display(), output_root.display() )]
	OverlappingRoots { source_root: PathBuf, output_root: PathBuf },
	/// Another build is running and the request asked not to wait.
	#[error( "A build is already in progress" )]
	BuildInProgress,
}

/// Problems that degrade a build without failing any particular file.
#[derive( Debug, Error )]
pub enum BuildWarning {
	/// A configured library container could not be opened and was left out of the loader.
	#[error( "Container skipped: {0}" )]
	ContainerSkipped( #[from] ContainerError ),
	/// Part of the source tree could not be read.
	#[error( "{0}" )]
	Discovery( #[from] DiscoveryIssue ),
}

/// A source that compiled but whose unit could not be resolved.
#[derive( Debug, Error )]
#[error( "Failed to link '{identity}' (from '{}'): {error}", source_file.display() )]
pub struct LinkFailure {
	identity: IdentityName,
	source_file: PathBuf,
	#[source] error: ResolveError,
}

impl LinkFailure {

	/// The identity that failed to link.
	#[inline] pub fn identity( &self ) -> &IdentityName { &self.identity }

	/// The source file it was compiled from.
	#[inline] pub fn source_file( &self ) -> &Path { &self.source_file }

	/// Why resolution failed.
	#[inline] pub fn error( &self ) -> &ResolveError { &self.error }

}

/// Everything a finished build produced.
#[derive( Debug )]
pub struct BuildResult {
	generation: Arc<Generation>,
	failed_sources: Vec<CompileFailure>,
	failed_links: Vec<LinkFailure>,
	warnings: Vec<BuildWarning>,
}

impl BuildResult {

	/// The generation built from the successfully compiled and linked sources.
	#[inline] pub fn generation( &self ) -> &Arc<Generation> { &self.generation }

	/// The generation's capability index.
	#[inline] pub fn index( &self ) -> &CapabilityIndex { self.generation.index() }

	/// Identities compiled and linked in this build, ordered by name.
	pub fn compiled_identities( &self ) -> impl Iterator<Item = &CompiledIdentity> { self.index().identities() }

	/// Sources that produced no artifact, ordered by path.
	#[inline] pub fn failed_sources( &self ) -> &[CompileFailure] { &self.failed_sources }

	/// Sources that compiled but failed to link, ordered by identity.
	#[inline] pub fn failed_links( &self ) -> &[LinkFailure] { &self.failed_links }

	/// Non-fatal problems with the build environment.
	#[inline] pub fn warnings( &self ) -> &[BuildWarning] { &self.warnings }

	/// Whether every discovered source made it into the index.
	pub fn is_clean( &self ) -> bool { self.failed_sources.is_empty() && self.failed_links.is_empty() }

}

/// Builds source trees into generations.
///
/// A pipeline is reusable; every call to [`build`]( Self::build ) produces a new,
/// independent generation with the next generation id. The pipeline itself does
/// not serialise builds; [`Workspace`]( crate::Workspace ) does.
pub struct BuildPipeline {
	engine: Engine,
	host: Arc<HostNamespace>,
	compiler: Box<dyn Compiler>,
	config: BuildConfig,
	next_generation: AtomicU64,
}

impl BuildPipeline {

	/// Creates a pipeline compiling with `compiler` and falling back to `host`
	/// for names no build supplies.
	pub fn new( engine: &Engine, host: Arc<HostNamespace>, compiler: impl Compiler + 'static, config: BuildConfig ) -> Self {
		Self {
			engine: engine.clone(),
			host,
			compiler: Box::new( compiler ),
			config,
			next_generation: AtomicU64::new( 1 ),
		}
	}

	/// Creates a pipeline running the [`ExternalCompiler`] described by `config`.
	///
	/// # Errors
	/// [`ConfigError::MissingCompiler`] if `config` has no compiler section.
	pub fn from_config( engine: &Engine, host: Arc<HostNamespace>, config: BuildConfig ) -> Result<Self, ConfigError> {
		let compiler = config.compiler().map( ExternalCompiler::from_config ).ok_or( ConfigError::MissingCompiler )?;
		Ok( Self::new( engine, host, compiler, config ))
	}

	/// The build configuration.
	#[inline] pub fn config( &self ) -> &BuildConfig { &self.config }

	/// The host namespace every generation falls back to.
	#[inline] pub fn host( &self ) -> &Arc<HostNamespace> { &self.host }

	/// The engine units are compiled with.
	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }

	/// Rebuilds every source under `source_root` into `output_root`.
	///
	/// The output root is cleared first and must not be written to by anything
	/// else while the build runs. Sources are all compiled before any is resolved,
	/// so units may extend or import units compiled later in the same build.
	///
	/// # Errors
	/// Only if the output root can't be prepared or the source root can't be read.
	/// Failures of individual files are reported through the [`BuildResult`].
	pub fn build( &self, source_root: &Path, output_root: &Path ) -> Result<BuildResult, BuildError> {

		let started = Instant::now();
		let generation_id = self.next_generation.fetch_add( 1, Ordering::Relaxed );
		tracing::info!( generation = generation_id, source_root = %source_root.display(), output_root = %output_root.display(), "Starting build" );

		check_roots( source_root, output_root )?;
		prepare_output_root( output_root )?;

		let ( sources, issues ) = discover_sources( source_root, self.config.source_extension() )
			.map_err(| err | BuildError::SourceDiscovery { path: source_root.to_path_buf(), source: err })?;

		let mut failed_sources = Vec::new();
		let mut warnings = Vec::new();
		for issue in issues {
			match issue {
				DiscoveryIssue::InvalidIdentity { path, error } => {
					tracing::warn!( source = %path.display(), "Skipping source: {}", error );
					failed_sources.push( CompileFailure::new( path, None, CompileError::InvalidIdentity( error )));
				}
				issue @ DiscoveryIssue::UnreadableDirectory { .. } => {
					tracing::warn!( "{}", issue );
					warnings.push( BuildWarning::from( issue ));
				}
			}
		}

		let mut compiled = Vec::with_capacity( sources.len() );
		for source in &sources {
			match self.compile( source, output_root )? {
				Ok(()) => compiled.push( source ),
				Err( error ) => {
					tracing::warn!( source = %source.path().display(), "Compilation failed: {}", error );
					failed_sources.push( CompileFailure::new( source.path(), Some( source.identity().clone() ), error ));
				}
			}
		}

		let roots = std::iter::once( output_root.to_path_buf() ).chain( self.config.libraries().iter().cloned() );
		let ( loader, skipped ) = ModuleLoader::from_roots( &self.engine, roots, Arc::clone( &self.host ));
		let loader = Arc::new( loader.with_artifact_extension( self.config.artifact_extension() ));
		warnings.extend( skipped.into_iter().map( BuildWarning::from ));

		let ( identities, mut failed_links ) = resolve_all( &loader, compiled );

		failed_sources.sort_by(| a, b | a.path().cmp( b.path() ));
		failed_links.sort_by(| a, b | a.identity.cmp( &b.identity ));

		let index = CapabilityIndex::new( identities, Arc::clone( &loader ));
		tracing::info!(
			generation = generation_id,
			compiled = index.len(),
			failed_sources = failed_sources.len(),
			failed_links = failed_links.len(),
			elapsed = ?started.elapsed(),
			"Build finished"
		);

		Ok( BuildResult {
			generation: Arc::new( Generation::new( generation_id, loader, index )),
			failed_sources,
			failed_links,
			warnings,
		})

	}

	/// Compiles one source. The outer error aborts the build, the inner one fails the file.
	fn compile( &self, source: &SourceUnit, output_root: &Path ) -> Result<Result<(), CompileError>, BuildError> {

		let artifact = source.identity().artifact_path( output_root, self.config.artifact_extension() );
		if let Some( parent ) = artifact.parent() {
			std::fs::create_dir_all( parent )
				.map_err(| err | BuildError::OutputPreparation { path: parent.to_path_buf(), source: err })?;
		}

		tracing::debug!( source = %source.path().display(), identity = %source.identity(), "Compiling" );
		let outcome = self.compiler.compile( &Invocation::new( source, output_root, &artifact ))
			.and_then(|()| match artifact.is_file() {
				true => Ok(()),
				false => Err( CompileError::MissingArtifact( artifact.clone() )),
			});

		// Whatever a failed compiler left behind must not be served by the output container.
		if outcome.is_err() {
			let removed = match artifact.is_dir() {
				true => std::fs::remove_dir_all( &artifact ),
				false => std::fs::remove_file( &artifact ),
			};
			match removed {
				Ok(()) => tracing::debug!( artifact = %artifact.display(), "Removed artifact of failed compilation" ),
				Err( err ) if err.kind() == ErrorKind::NotFound => {}
				Err( err ) => return Err( BuildError::OutputPreparation { path: artifact, source: err }),
			}
		}

		Ok( outcome )

	}

}

impl std::fmt::Debug for BuildPipeline {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "BuildPipeline" )
			.field( "host", &self.host )
			.field( "config", &self.config )
			.field( "next_generation", &self.next_generation )
			.finish_non_exhaustive()
	}
}

fn resolve_all( loader: &ModuleLoader, compiled: Vec<&SourceUnit> ) -> ( Vec<CompiledIdentity>, Vec<LinkFailure> ) {
	let mut identities = Vec::with_capacity( compiled.len() );
	let mut failures = Vec::new();
	for source in compiled {
		match loader.resolve( source.identity() ) {
			Ok( unit ) => identities.push( CompiledIdentity::new( unit, Some( source.path().to_path_buf() ))),
			Err( error ) => {
				tracing::warn!( identity = %source.identity(), "Linking failed: {}", error );
				failures.push( LinkFailure {
					identity: source.identity().clone(),
					source_file: source.path().to_path_buf(),
					error,
				});
			}
		}
	}
	( identities, failures )
}

fn check_roots( source_root: &Path, output_root: &Path ) -> Result<(), BuildError> {
	let source = source_root.canonicalize().unwrap_or_else(|_| source_root.to_path_buf() );
	let output = output_root.canonicalize().unwrap_or_else(|_| output_root.to_path_buf() );
	match source.starts_with( &output ) {
		true => Err( BuildError::OverlappingRoots { source_root: source_root.to_path_buf(), output_root: output_root.to_path_buf() }),
		false => Ok(()),
	}
}

fn prepare_output_root( output_root: &Path ) -> Result<(), BuildError> {
	let error = | err: std::io::Error | BuildError::OutputPreparation { path: output_root.to_path_buf(), source: err };
	match std::fs::remove_dir_all( output_root ) {
		Ok(()) => {}
		Err( err ) if err.kind() == ErrorKind::NotFound => {}
		Err( err ) => return Err( error( err )),
	}
	std::fs::create_dir_all( output_root ).map_err( error )
}
