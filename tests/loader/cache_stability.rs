use std::sync::Arc ;
use wasm_hotload::{ Classification, Engine, HostNamespace, IdentityName, ModuleLoader, ResolveError };
use crate::containers::{ MemoryContainer, count };

#[test]
fn cache_stability_unresolvable_name_is_not_rescanned() {

	let engine = Engine::default();
	let container = MemoryContainer::new( "fresh" );
	let lookups = container.lookup_counter();
	let loader = ModuleLoader::new( &engine, vec![ container.boxed() ], Arc::new( HostNamespace::empty() ));
	let name = IdentityName::new( "nowhere.Thing" ).unwrap();

	assert!( matches!( loader.resolve( &name ), Err( ResolveError::NotFound( _ ))));
	assert_eq!( count( &lookups ), 1 );
	assert_eq!( loader.classification( "nowhere.Thing" ), Some( Classification::Unresolvable ));

	assert!( matches!( loader.resolve( &name ), Err( ResolveError::NotFound( _ ))));
	assert_eq!( count( &lookups ), 1 );
	assert_eq!( loader.classification( "nowhere.Thing" ), Some( Classification::Unresolvable ));

	let stats = loader.stats();
	assert_eq!( stats.container_scans, 1 );
	assert_eq!( stats.cache_hits, 1 );
	assert_eq!( stats.host_fallbacks, 1 );

}

#[test]
fn cache_stability_host_fallback_is_not_rescanned() {

	let engine = Engine::default();
	let host = HostNamespace::builder( &engine ).define( "host.Tool", "(module)" ).unwrap().build();
	let first = MemoryContainer::new( "first" );
	let second = MemoryContainer::new( "second" );
	let ( first_lookups, second_lookups ) = ( first.lookup_counter(), second.lookup_counter() );
	let loader = ModuleLoader::new( &engine, vec![ first.boxed(), second.boxed() ], Arc::new( host ));
	let name = IdentityName::new( "host.Tool" ).unwrap();

	let a = loader.resolve( &name ).unwrap();
	let b = loader.resolve( &name ).unwrap();
	assert!( Arc::ptr_eq( &a, &b ));
	assert_eq!( count( &first_lookups ), 1 );
	assert_eq!( count( &second_lookups ), 1 );
	assert_eq!( loader.stats().container_lookups, 2 );

}

#[test]
fn cache_stability_resolved_name_is_not_rescanned() {

	let engine = Engine::default();
	let container = MemoryContainer::new( "fresh" ).with_unit( "a.Foo", "(module)" );
	let lookups = container.lookup_counter();
	let loader = ModuleLoader::new( &engine, vec![ container.boxed() ], Arc::new( HostNamespace::empty() ));
	let name = IdentityName::new( "a.Foo" ).unwrap();

	for _ in 0..5 { loader.resolve( &name ).unwrap(); }
	assert_eq!( count( &lookups ), 1 );
	assert_eq!( loader.classification( "a.Foo" ), Some( Classification::Resolved ));
	assert_eq!( loader.stats().cache_hits, 4 );

}

#[test]
fn cache_stability_linkage_failures_are_not_cached() {

	let engine = Engine::default();
	let container = MemoryContainer::new( "fresh" ).with_unit( "a.Broken", "(module (func" );
	let lookups = container.lookup_counter();
	let loader = ModuleLoader::new( &engine, vec![ container.boxed() ], Arc::new( HostNamespace::empty() ));
	let name = IdentityName::new( "a.Broken" ).unwrap();

	assert!( matches!( loader.resolve( &name ), Err( ResolveError::Linkage( _ ))));
	assert_eq!( loader.classification( "a.Broken" ), None );
	assert!( matches!( loader.resolve( &name ), Err( ResolveError::Linkage( _ ))));
	assert_eq!( count( &lookups ), 2 );

}
