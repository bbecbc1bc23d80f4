//! Discovery of source files beneath a source root.

use std::path::{ Path, PathBuf };
use pipe_trait::Pipe ;
use thiserror::Error ;

use crate::identity::{ IdentityError, IdentityName };
use crate::utils::PartialSuccess ;



/// A source file found by [`discover_sources`], together with the identity it compiles to.
///
/// Source units only live for the duration of one build; what survives is the
/// source path recorded on each compiled identity.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct SourceUnit {
	path: PathBuf,
	relative_path: PathBuf,
	identity: IdentityName,
}

impl SourceUnit {

	/// Absolute (or root-joined) path of the source file.
	#[inline] pub fn path( &self ) -> &Path { &self.path }

	/// Path relative to the source root.
	#[inline] pub fn relative_path( &self ) -> &Path { &self.relative_path }

	/// Identity derived from the relative path.
	#[inline] pub fn identity( &self ) -> &IdentityName { &self.identity }

}

/// Problems met during discovery that don't stop it.
#[derive( Debug, Error )]
pub enum DiscoveryIssue {
	/// A file with the source extension whose path can't be mapped to an identity.
	#[error( "Cannot derive an identity for '{}': {error}", path.display() )]
	InvalidIdentity { path: PathBuf, #[source] error: IdentityError },
	/// A directory below the root could not be listed; its contents are skipped.
	#[error( "Failed to read directory '{}': {error}", path.display() )]
	UnreadableDirectory { path: PathBuf, #[source] error: std::io::Error },
}

/// Recursively collects every regular file under `root` whose extension is
/// `extension`, sorted by relative path.
///
/// Symbolic links to files are followed; symbolic links to directories are not.
///
/// # Errors
/// Only if `root` itself cannot be read. Problems below the root are returned
/// alongside the discovered units.
pub fn discover_sources( root: &Path, extension: &str ) -> Result<PartialSuccess<Vec<SourceUnit>, DiscoveryIssue>, std::io::Error> {

	let mut units = Vec::new();
	let mut issues = Vec::new();
	let mut pending = vec![ PathBuf::new() ];
	let mut is_root = true ;

	while let Some( relative_dir ) = pending.pop() {

		let entries = match std::fs::read_dir( root.join( &relative_dir )) {
			Ok( entries ) => entries,
			Err( err ) if is_root => return Err( err ),
			Err( error ) => {
				issues.push( DiscoveryIssue::UnreadableDirectory { path: root.join( &relative_dir ), error });
				continue ;
			}
		};
		is_root = false ;

		for entry in entries {
			let entry = match entry {
				Ok( entry ) => entry,
				Err( error ) => {
					issues.push( DiscoveryIssue::UnreadableDirectory { path: root.join( &relative_dir ), error });
					continue ;
				}
			};
			let relative_path = relative_dir.join( entry.file_name() );
			let Ok( file_type ) = entry.file_type() else { continue };

			if file_type.is_dir() {
				pending.push( relative_path );
				continue ;
			}

			let is_file = file_type.is_file() || ( file_type.is_symlink() && entry.path().is_file() );
			let has_extension = relative_path.extension().and_then(| ext | ext.to_str() ) == Some( extension );
			if !is_file || !has_extension { continue }

			match IdentityName::from_relative_path( &relative_path, extension ) {
				Ok( identity ) => units.push( SourceUnit { path: entry.path(), relative_path, identity }),
				Err( error ) => issues.push( DiscoveryIssue::InvalidIdentity { path: entry.path(), error }),
			}
		}

	}

	units
		.pipe(| mut units | { units.sort_by( | a, b | a.relative_path.cmp( &b.relative_path )); units })
		.pipe(| units | Ok(( units, issues )))

}
