//! Generations and the workspace publishing them.

use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex, PoisonError, RwLock, TryLockError };
use std::sync::atomic::{ AtomicBool, Ordering };

use crate::index::CapabilityIndex ;
use crate::loader::ModuleLoader ;
use crate::pipeline::{ BuildError, BuildPipeline, BuildResult };



/// The outcome of one successful build: a loader over that build's containers and
/// the capability index computed through it.
///
/// Generations are never mutated after the build that produced them. Dropping the
/// last handle to a generation drops its loader, which releases every container
/// (and thus every open archive) the build opened.
#[derive( Debug )]
pub struct Generation {
	id: u64,
	loader: Arc<ModuleLoader>,
	index: CapabilityIndex,
	retired: AtomicBool,
}

impl Generation {

	pub(crate) fn new( id: u64, loader: Arc<ModuleLoader>, index: CapabilityIndex ) -> Self {
		Self { id, loader, index, retired: AtomicBool::new( false ) }
	}

	/// Monotonic id, unique per pipeline.
	#[inline] pub fn id( &self ) -> u64 { self.id }

	/// The loader that resolved this generation's units.
	#[inline] pub fn loader( &self ) -> &Arc<ModuleLoader> { &self.loader }

	/// The capability index of this generation.
	#[inline] pub fn index( &self ) -> &CapabilityIndex { &self.index }

	/// Whether a later build has started. Retired generations must no longer be queried.
	pub fn is_retired( &self ) -> bool { self.retired.load( Ordering::Acquire ) }

	pub(crate) fn retire( &self ) {
		if !self.retired.swap( true, Ordering::AcqRel ) {
			tracing::debug!( generation = self.id, "Retired generation" );
		}
	}

}

/// A source root and output root pair, rebuilt on request, with at most one
/// published [`Generation`] at a time.
///
/// Builds are serialised: [`rebuild`]( Self::rebuild ) waits for a build already in
/// flight, [`try_rebuild`]( Self::try_rebuild ) refuses instead. Starting a build
/// retires and unpublishes the current generation; the new one is published in a
/// single swap once the build completes. Hosts wanting a responsive UI run
/// rebuilds on a worker thread and keep querying [`current`]( Self::current ).
#[derive( Debug )]
pub struct Workspace {
	pipeline: BuildPipeline,
	source_root: PathBuf,
	output_root: PathBuf,
	build_lock: Mutex<()>,
	current: RwLock<Option<Arc<Generation>>>,
}

impl Workspace {

	/// Creates a workspace with no generation published yet.
	pub fn new( pipeline: BuildPipeline, source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf> ) -> Self {
		Self {
			pipeline,
			source_root: source_root.into(),
			output_root: output_root.into(),
			build_lock: Mutex::new(()),
			current: RwLock::new( None ),
		}
	}

	/// Rebuilds, waiting for any build in flight to finish first.
	///
	/// # Errors
	/// Whatever aborted the build; no generation is published afterwards.
	pub fn rebuild( &self ) -> Result<BuildResult, BuildError> {
		let _guard = self.build_lock.lock().unwrap_or_else( PoisonError::into_inner );
		self.run_build()
	}

	/// Rebuilds unless another build is in flight.
	///
	/// # Errors
	/// [`BuildError::BuildInProgress`] if a build is running, otherwise as [`rebuild`]( Self::rebuild ).
	pub fn try_rebuild( &self ) -> Result<BuildResult, BuildError> {
		let _guard = match self.build_lock.try_lock() {
			Ok( guard ) => guard,
			Err( TryLockError::Poisoned( poisoned )) => poisoned.into_inner(),
			Err( TryLockError::WouldBlock ) => return Err( BuildError::BuildInProgress ),
		};
		self.run_build()
	}

	/// The published generation, if any. `None` before the first build, while a
	/// build is running, and after a build failed fatally.
	pub fn current( &self ) -> Option<Arc<Generation>> {
		self.current.read().unwrap_or_else( PoisonError::into_inner )
			.as_ref()
			.filter(| generation | !generation.is_retired() )
			.cloned()
	}

	/// Retires and unpublishes the current generation. Its containers are released
	/// once the last outstanding handle is dropped.
	pub fn shutdown( &self ) {
		let _guard = self.build_lock.lock().unwrap_or_else( PoisonError::into_inner );
		self.unpublish();
	}

	/// The pipeline builds run through.
	#[inline] pub fn pipeline( &self ) -> &BuildPipeline { &self.pipeline }

	/// Where sources are read from.
	#[inline] pub fn source_root( &self ) -> &Path { &self.source_root }

	/// Where artifacts are written to.
	#[inline] pub fn output_root( &self ) -> &Path { &self.output_root }

	fn run_build( &self ) -> Result<BuildResult, BuildError> {
		self.unpublish();
		let result = self.pipeline.build( &self.source_root, &self.output_root )?;
		*self.current.write().unwrap_or_else( PoisonError::into_inner ) = Some( Arc::clone( result.generation() ));
		tracing::debug!( generation = result.generation().id(), "Published generation" );
		Ok( result )
	}

	fn unpublish( &self ) {
		let previous = self.current.write().unwrap_or_else( PoisonError::into_inner ).take();
		if let Some( generation ) = previous { generation.retire() }
	}

}
