use wasm_hotload::{ ContainerError, open_container };
use crate::fixtures::{ write_archive, write_tree };

#[test]
fn open_container_picks_variant_by_path() {

	let dir = tempfile::tempdir().unwrap();
	write_tree( dir.path(), &[( "loose/a/Foo.wasm", "loose" )]);
	write_archive( &dir.path().join( "packed.zip" ), &[( "a/Foo.wasm", "(module)" )]);

	let loose = open_container( &dir.path().join( "loose" )).unwrap();
	assert_eq!( loose.lookup( "a/Foo.wasm" ).unwrap().as_deref(), Some( b"loose".as_slice() ));

	let packed = open_container( &dir.path().join( "packed.zip" )).unwrap();
	assert_eq!( packed.lookup( "a/Foo.wasm" ).unwrap(), Some( wat::parse_str( "(module)" ).unwrap() ));

	assert!( format!( "{:?}", loose ).contains( "DirectoryContainer" ));
	assert!( format!( "{:?}", packed ).contains( "ArchiveContainer" ));

}

#[test]
fn open_container_missing_path_is_unavailable() {

	let dir = tempfile::tempdir().unwrap();
	match open_container( &dir.path().join( "missing" )) {
		Err( ContainerError::Unavailable( _ )) => {},
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}

}
