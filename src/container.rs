//! Uniform byte lookup over the places compiled units live.
//!
//! A [`Container`] maps a logical, `/`-separated resource name (e.g. `tools/Brush.wasm`)
//! to the bytes stored under it. Two variants ship with the crate:
//!
//! - [`DirectoryContainer`]: resolves resource names beneath a directory root.
//! - [`ArchiveContainer`]: resolves resource names as entries of a zip archive that
//! 	stays open for as long as the container lives and is closed when it is dropped.
//!
//! Lookups distinguish "absent" (`Ok( None )`) from genuine I/O failures (`Err`).
//! Hosts may implement [`Container`] themselves to serve units from elsewhere.

mod directory ;
mod archive ;

pub use directory::DirectoryContainer ;
pub use archive::ArchiveContainer ;

use std::path::{ Path, PathBuf };
use thiserror::Error ;



/// Errors raised while opening or reading a [`Container`].
#[derive( Debug, Error )]
pub enum ContainerError {
	/// The configured root does not exist. Loaders skip such containers.
	#[error( "Container root '{}' is unavailable", .0.display() )]
	Unavailable( PathBuf ),
	/// Reading from the container failed (permissions, vanished mount, ...).
	#[error( "I/O error reading '{}': {source}", path.display() )]
	Io { path: PathBuf, source: std::io::Error },
	/// The archive could not be parsed or one of its entries is unreadable.
	#[error( "Corrupted archive '{}': {source}", path.display() )]
	Archive { path: PathBuf, source: zip::result::ZipError },
	/// Failed to acquire the lock on a shared archive handle.
	#[error( "Lock rejected on '{}'", .0.display() )]
	LockRejected( PathBuf ),
}

/// A source of compiled unit bytes keyed by logical resource name.
pub trait Container: Send + Sync + std::fmt::Debug {

	/// Returns the bytes stored under `resource_name`, or `None` if the container
	/// doesn't hold such a resource. Never returns partial data.
	///
	/// # Errors
	/// Only for genuine read failures; a missing resource is not an error.
	fn lookup( &self, resource_name: &str ) -> Result<Option<Vec<u8>>, ContainerError> ;

	/// The path this container was opened from.
	fn root( &self ) -> &Path ;

	/// Resource names of every unit the container holds, in no particular order.
	///
	/// Containers that cannot enumerate their contents keep the default empty
	/// listing; their units are then only found when something asks for them by name.
	///
	/// # Errors
	/// Only for genuine read failures.
	fn resources( &self ) -> Result<Vec<String>, ContainerError> { Ok( Vec::new() ) }

}

/// Opens the container variant matching what lives at `path`: a directory becomes
/// a [`DirectoryContainer`], anything else is opened as an [`ArchiveContainer`].
///
/// # Errors
/// [`ContainerError::Unavailable`] if nothing exists at `path`, otherwise whatever
/// opening the variant produced.
pub fn open_container( path: &Path ) -> Result<Box<dyn Container>, ContainerError> {
	match std::fs::metadata( path ) {
		Ok( metadata ) if metadata.is_dir() => Ok( Box::new( DirectoryContainer::new( path )? )),
		Ok( _ ) => Ok( Box::new( ArchiveContainer::open( path )? )),
		Err( err ) if err.kind() == std::io::ErrorKind::NotFound => Err( ContainerError::Unavailable( path.to_path_buf() )),
		Err( source ) => Err( ContainerError::Io { path: path.to_path_buf(), source }),
	}
}

/// Splits a resource name into path segments, rejecting names that could escape
/// a container root (absolute names, empty, `.` or `..` segments, backslashes).
pub(crate) fn resource_segments( resource_name: &str ) -> Option<Vec<&str>> {
	if resource_name.is_empty() || resource_name.contains( '\\' ) { return None }
	let segments = resource_name.split( '/' ).collect::<Vec<_>>();
	match segments.iter().all(| segment | !segment.is_empty() && *segment != "." && *segment != ".." ) {
		true => Some( segments ),
		false => None,
	}
}
