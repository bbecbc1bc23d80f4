#[macro_export]
macro_rules! fixture_path {
	( $( $segment:expr ),* $(,)? ) => {{
		std::path::PathBuf::from( env!( "CARGO_MANIFEST_DIR" ))
			.join( $crate::fixtures::strip_rs( file!() ))
			$( .join( $segment ) )*
	}};
}

#[macro_export]
macro_rules! assert_no_warnings {
	( $warnings:expr ) => {
		if !$warnings.is_empty() { panic!( "Produced warnings: {:?}", $warnings ) }
	};
}

#[allow( dead_code )]
mod fixtures {

	use std::path::Path ;

	/// Fixture trees live in a directory named after the test file that uses them.
	pub const fn strip_rs( path: &'static str ) -> &'static str {
		match path.as_bytes() {
			[rest @ .., b'.', b'r', b's'] => {
				// SAFETY: the last three bytes are ".rs", so the split is at a UTF-8 boundary.
				unsafe { core::str::from_utf8_unchecked( rest ) }
			}
			_ => unreachable!(),
		}
	}

	/// Writes `files` (relative path, contents) beneath `root`, creating directories as needed.
	pub fn write_tree( root: &Path, files: &[( &str, &str )] ) {
		for ( relative, contents ) in files {
			let path = root.join( relative );
			if let Some( parent ) = path.parent() { std::fs::create_dir_all( parent ).unwrap() }
			std::fs::write( &path, contents ).unwrap();
		}
	}

	/// Writes a zip archive holding `entries` (resource name, WAT text compiled to binary).
	pub fn write_archive( path: &Path, entries: &[( &str, &str )] ) {
		use std::io::Write ;
		let mut writer = zip::ZipWriter::new( std::fs::File::create( path ).unwrap() );
		let options = zip::write::SimpleFileOptions::default();
		for ( name, wat ) in entries {
			writer.start_file( *name, options ).unwrap();
			writer.write_all( &wat::parse_str( wat ).unwrap() ).unwrap();
		}
		writer.finish().unwrap();
	}

	pub fn names<'a>( identities: impl IntoIterator<Item = &'a wasm_hotload::CompiledIdentity> ) -> Vec<&'a str> {
		identities.into_iter().map(| identity | identity.name().as_str() ).collect()
	}

}
