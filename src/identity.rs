use std::path::{ Component, Path, PathBuf };
use thiserror::Error ;



/// The dotted name a compiled unit is known by (e.g. `tools.paint.Brush`).
///
/// Names are derived from a source file's path relative to the source root:
/// directory separators become [`IdentityName::SEPARATOR`] and the source
/// extension is dropped, so `tools/paint/Brush.src` becomes `tools.paint.Brush`.
/// Since the mapping is one-to-one, two source files can never claim the same
/// identity within one build.
#[derive( Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash )]
pub struct IdentityName( String );

/// Reasons a string or path cannot be turned into an [`IdentityName`].
#[derive( Debug, Error, Clone, PartialEq, Eq )]
pub enum IdentityError {
	/// The name has no segments at all.
	#[error( "Empty identity name" )] Empty,
	/// A segment is empty, contains a separator, or is otherwise unusable.
	#[error( "Invalid segment '{segment}' in identity '{name}'" )]
	InvalidSegment { name: String, segment: String },
	/// The path does not end in the expected source extension.
	#[error( "Path '{}' does not carry the expected extension", .0.display() )]
	WrongExtension( PathBuf ),
	/// The path is absolute or walks out of its root.
	#[error( "Path '{}' is not a plain relative path", .0.display() )]
	NotRelative( PathBuf ),
}

impl IdentityName {

	/// Separator between the segments of an identity name.
	pub const SEPARATOR: char = '.';

	/// Parses a dotted identity name.
	///
	/// # Errors
	/// Fails if the name is empty or any segment is empty or contains a path separator.
	pub fn new( name: impl Into<String> ) -> Result<Self, IdentityError> {
		let name = name.into();
		if name.is_empty() { return Err( IdentityError::Empty )}
		if let Some( segment ) = name.split( Self::SEPARATOR ).find(| segment | !is_valid_segment( segment )) {
			return Err( IdentityError::InvalidSegment { name: name.clone(), segment: segment.to_string() });
		}
		Ok( Self( name ))
	}

	/// Derives the identity of a source file from its path relative to the source root.
	///
	/// # Errors
	/// Fails if the path is not relative, lacks `extension`, or one of its
	/// components cannot serve as an identity segment: a file stem containing a
	/// dot would collide with the nested path, and a name that isn't UTF-8 has
	/// no exact spelling.
	pub fn from_relative_path( path: &Path, extension: &str ) -> Result<Self, IdentityError> {

		if path.extension().and_then(| ext | ext.to_str() ) != Some( extension ) {
			return Err( IdentityError::WrongExtension( path.to_path_buf() ));
		}

		let stem = path.with_extension( "" );
		let segments = stem.components()
			.map(| component | match component {
				Component::Normal( segment ) => segment.to_str()
					.filter(| segment | is_valid_segment( segment ))
					.ok_or_else(|| IdentityError::InvalidSegment {
						name: path.to_string_lossy().into_owned(),
						segment: segment.to_string_lossy().into_owned(),
					}),
				_ => Err( IdentityError::NotRelative( path.to_path_buf() )),
			})
			.collect::<Result<Vec<_>, _>>()?;

		Self::new( segments.join( SEPARATOR_STR ))

	}

	/// The dotted name.
	#[inline] pub fn as_str( &self ) -> &str { &self.0 }

	/// Iterates over the dot-separated segments.
	pub fn segments( &self ) -> impl Iterator<Item = &str> { self.0.split( Self::SEPARATOR ) }

	/// The last segment, i.e. the simple name without its namespace.
	pub fn simple_name( &self ) -> &str {
		self.0.rsplit( Self::SEPARATOR ).next().unwrap_or( &self.0 )
	}

	/// Logical resource name of this identity's artifact inside a container,
	/// always `/`-separated (`a.Foo` with extension `wasm` is `a/Foo.wasm`).
	pub fn resource_name( &self, artifact_extension: &str ) -> String {
		format!( "{}.{}", self.segments().collect::<Vec<_>>().join( "/" ), artifact_extension )
	}

	/// Filesystem location of this identity's artifact beneath `root`.
	pub fn artifact_path( &self, root: &Path, artifact_extension: &str ) -> PathBuf {
		self.segments()
			.fold( root.to_path_buf(), | path, segment | path.join( segment ))
			.with_extension( artifact_extension )
	}

}

const SEPARATOR_STR: &str = "." ;

fn is_valid_segment( segment: &str ) -> bool {
	!segment.is_empty()
		&& !segment.chars().any(| c | c == '/' || c == '\\' || c == IdentityName::SEPARATOR || c.is_control() )
}

impl std::fmt::Display for IdentityName {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result { f.write_str( &self.0 )}
}

impl std::str::FromStr for IdentityName {
	type Err = IdentityError ;
	fn from_str( name: &str ) -> Result<Self, Self::Err> { Self::new( name )}
}

impl TryFrom<&str> for IdentityName {
	type Error = IdentityError ;
	fn try_from( name: &str ) -> Result<Self, Self::Error> { Self::new( name )}
}

impl std::borrow::Borrow<str> for IdentityName {
	fn borrow( &self ) -> &str { &self.0 }
}

impl AsRef<str> for IdentityName {
	fn as_ref( &self ) -> &str { &self.0 }
}
