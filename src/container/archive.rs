use std::fs::File ;
use std::io::{ ErrorKind, Read };
use std::path::{ Path, PathBuf };
use std::sync::Mutex ;
use zip::ZipArchive ;
use zip::result::ZipError ;

use super::{ Container, ContainerError, resource_segments };



/// A [`Container`] serving the entries of a zip archive.
///
/// The archive is opened once on construction and its file handle is held until
/// the container is dropped. Since a loader owns its containers, the handle lives
/// exactly as long as the loader generation that opened it.
pub struct ArchiveContainer {
	path: PathBuf,
	archive: Mutex<ZipArchive<File>>,
}

impl ArchiveContainer {

	/// Opens the archive at `path` and reads its central directory.
	///
	/// # Errors
	/// [`ContainerError::Unavailable`] if the file does not exist,
	/// [`ContainerError::Archive`] if it is not a readable zip archive.
	pub fn open( path: impl Into<PathBuf> ) -> Result<Self, ContainerError> {

		let path = path.into();
		let file = File::open( &path ).map_err(| source | match source.kind() {
			ErrorKind::NotFound => ContainerError::Unavailable( path.clone() ),
			_ => ContainerError::Io { path: path.clone(), source },
		})?;
		let archive = ZipArchive::new( file )
			.map_err(| source | ContainerError::Archive { path: path.clone(), source })?;

		tracing::debug!( archive = %path.display(), entries = archive.len(), "Opened archive container" );
		Ok( Self { path, archive: Mutex::new( archive )})

	}

	/// Number of entries (files and directories) in the archive.
	///
	/// # Errors
	/// [`ContainerError::LockRejected`] if the archive lock is poisoned.
	pub fn entry_count( &self ) -> Result<usize, ContainerError> {
		Ok( self.archive.lock().map_err(|_| ContainerError::LockRejected( self.path.clone() ))?.len() )
	}

}

impl Container for ArchiveContainer {

	fn lookup( &self, resource_name: &str ) -> Result<Option<Vec<u8>>, ContainerError> {

		if resource_segments( resource_name ).is_none() { return Ok( None )}

		let mut archive = self.archive.lock().map_err(|_| ContainerError::LockRejected( self.path.clone() ))?;
		let mut entry = match archive.by_name( resource_name ) {
			Ok( entry ) => entry,
			Err( ZipError::FileNotFound ) => return Ok( None ),
			Err( source ) => return Err( ContainerError::Archive { path: self.path.clone(), source }),
		};
		if entry.is_dir() { return Ok( None )}

		let mut bytes = Vec::with_capacity( usize::try_from( entry.size() ).unwrap_or( 0 ));
		entry.read_to_end( &mut bytes ).map_err(| source | ContainerError::Io { path: self.path.join( resource_name ), source })?;
		Ok( Some( bytes ))

	}

	#[inline] fn root( &self ) -> &Path { &self.path }

	fn resources( &self ) -> Result<Vec<String>, ContainerError> {
		let archive = self.archive.lock().map_err(|_| ContainerError::LockRejected( self.path.clone() ))?;
		Ok( archive.file_names().filter(| name | !name.ends_with( '/' )).map( str::to_string ).collect() )
	}

}

impl std::fmt::Debug for ArchiveContainer {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ArchiveContainer" )
			.field( "path", &self.path )
			.field( "archive", &"<ZipArchive>" )
			.finish()
	}
}

impl Drop for ArchiveContainer {
	fn drop( &mut self ) {
		tracing::debug!( archive = %self.path.display(), "Released archive container" );
	}
}
