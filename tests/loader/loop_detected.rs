use std::sync::Arc ;
use wasm_hotload::{ Engine, HostNamespace, IdentityName, LinkageError, ModuleLoader, ResolveError };
use crate::containers::MemoryContainer ;

#[test]
fn loop_detected_supertype_cycle() {

	let engine = Engine::default();
	let loader = ModuleLoader::new(
		&engine,
		vec![ MemoryContainer::new( "fresh" )
			.with_unit( "a.A", r#"(module (@custom "hotload.extends" "a.B"))"# )
			.with_unit( "a.B", r#"(module (@custom "hotload.extends" "a.A"))"# )
			.boxed()
		],
		Arc::new( HostNamespace::empty() ),
	);

	match loader.resolve( &IdentityName::new( "a.A" ).unwrap() ) {
		Err( ResolveError::Linkage( LinkageError::LoopDetected( chain ))) => {
			let chain = chain.iter().map( IdentityName::as_str ).collect::<Vec<_>>();
			assert_eq!( chain, vec![ "a.A", "a.B", "a.A" ]);
		}
		Err( err ) => panic!( "Unexpected error: {}", err ),
		Ok( _ ) => panic!( "Expected failure" ),
	}
	assert!( loader.registered_units().is_empty() );

}

#[test]
fn loop_detected_import_cycle() {

	let engine = Engine::default();
	let loader = ModuleLoader::new(
		&engine,
		vec![ MemoryContainer::new( "fresh" )
			.with_unit( "a.Ping", r#"(module (import "a.Pong" "pong" (func)) (func (export "ping")))"# )
			.with_unit( "a.Pong", r#"(module (import "a.Ping" "ping" (func)) (func (export "pong")))"# )
			.boxed()
		],
		Arc::new( HostNamespace::empty() ),
	);

	assert!( matches!(
		loader.resolve( &IdentityName::new( "a.Pong" ).unwrap() ),
		Err( ResolveError::Linkage( LinkageError::LoopDetected( _ )))
	));

}

#[test]
fn loop_detected_self_reference() {

	let engine = Engine::default();
	let loader = ModuleLoader::new(
		&engine,
		vec![ MemoryContainer::new( "fresh" ).with_unit( "a.Me", r#"(module (@custom "hotload.extends" "a.Me"))"# ).boxed() ],
		Arc::new( HostNamespace::empty() ),
	);

	assert!( matches!(
		loader.resolve( &IdentityName::new( "a.Me" ).unwrap() ),
		Err( ResolveError::Linkage( LinkageError::LoopDetected( _ )))
	));

}
