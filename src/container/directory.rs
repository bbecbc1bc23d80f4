use std::io::ErrorKind ;
use std::path::{ Path, PathBuf };

use super::{ Container, ContainerError, resource_segments };



/// A [`Container`] serving regular files beneath a directory root.
#[derive( Debug, Clone )]
pub struct DirectoryContainer {
	root: PathBuf,
}

impl DirectoryContainer {

	/// Creates a container rooted at `root`.
	///
	/// # Errors
	/// [`ContainerError::Unavailable`] if `root` is not an existing directory.
	pub fn new( root: impl Into<PathBuf> ) -> Result<Self, ContainerError> {
		let root = root.into();
		match root.is_dir() {
			true => Ok( Self { root }),
			false => Err( ContainerError::Unavailable( root )),
		}
	}

}

impl Container for DirectoryContainer {

	fn lookup( &self, resource_name: &str ) -> Result<Option<Vec<u8>>, ContainerError> {

		let Some( segments ) = resource_segments( resource_name ) else { return Ok( None )};
		let path = segments.into_iter().fold( self.root.clone(), | path, segment | path.join( segment ));

		match std::fs::metadata( &path ) {
			Ok( metadata ) if metadata.is_file() => match std::fs::read( &path ) {
				Ok( bytes ) => Ok( Some( bytes )),
				Err( err ) if is_absent( &err ) => Ok( None ),
				Err( source ) => Err( ContainerError::Io { path, source }),
			},
			Ok( _ ) => Ok( None ),
			Err( err ) if is_absent( &err ) => Ok( None ),
			Err( source ) => Err( ContainerError::Io { path, source }),
		}

	}

	#[inline] fn root( &self ) -> &Path { &self.root }

	fn resources( &self ) -> Result<Vec<String>, ContainerError> {

		let mut resources = Vec::new();
		let mut pending = vec![( self.root.clone(), String::new() )];

		while let Some(( dir, prefix )) = pending.pop() {
			let entries = std::fs::read_dir( &dir ).map_err(| source | ContainerError::Io { path: dir.clone(), source })?;
			for entry in entries {
				let entry = entry.map_err(| source | ContainerError::Io { path: dir.clone(), source })?;
				let Some( name ) = entry.file_name().to_str().map( str::to_string ) else { continue };
				let resource = match prefix.is_empty() {
					true => name,
					false => format!( "{}/{}", prefix, name ),
				};
				match entry.file_type() {
					Ok( file_type ) if file_type.is_dir() => pending.push(( entry.path(), resource )),
					Ok( _ ) if entry.path().is_file() => resources.push( resource ),
					_ => {}
				}
			}
		}

		Ok( resources )

	}

}

fn is_absent( err: &std::io::Error ) -> bool {
	matches!( err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory )
}
