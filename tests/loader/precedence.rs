use std::sync::Arc ;
use wasm_hotload::{ Engine, HostNamespace, IdentityName, ModuleLoader, UnitOrigin };
use crate::containers::MemoryContainer ;

const FRESH: &str = r#"(module (@custom "hotload.marker" "Fresh"))"# ;
const STALE: &str = r#"(module (@custom "hotload.marker" "Stale"))"# ;
const HOST: &str = r#"(module (@custom "hotload.marker" "Host"))"# ;

fn host( engine: &Engine ) -> Arc<HostNamespace> {
	Arc::new( HostNamespace::builder( engine )
		.define( "shared.Unit", HOST ).unwrap()
		.define( "host.Only", HOST ).unwrap()
		.build()
	)
}

#[test]
fn precedence_first_container_shadows_host() {

	let engine = Engine::default();
	let loader = ModuleLoader::new(
		&engine,
		vec![ MemoryContainer::new( "fresh" ).with_unit( "shared.Unit", FRESH ).boxed() ],
		host( &engine ),
	);

	let unit = loader.resolve( &IdentityName::new( "shared.Unit" ).unwrap() ).unwrap();
	assert!( unit.has_marker( "Fresh" ));
	assert!( !unit.has_marker( "Host" ));
	assert_eq!( unit.origin(), &UnitOrigin::Container( "fresh".into() ));

}

#[test]
fn precedence_earlier_container_wins() {

	let engine = Engine::default();
	let loader = ModuleLoader::new(
		&engine,
		vec![
			MemoryContainer::new( "first" ).with_unit( "shared.Unit", FRESH ).boxed(),
			MemoryContainer::new( "second" ).with_unit( "shared.Unit", STALE ).boxed(),
		],
		host( &engine ),
	);

	let unit = loader.resolve( &IdentityName::new( "shared.Unit" ).unwrap() ).unwrap();
	assert!( unit.has_marker( "Fresh" ));
	assert_eq!( unit.origin(), &UnitOrigin::Container( "first".into() ));

}

#[test]
fn precedence_host_answers_when_no_container_does() {

	let engine = Engine::default();
	let loader = ModuleLoader::new(
		&engine,
		vec![ MemoryContainer::new( "fresh" ).with_unit( "shared.Unit", FRESH ).boxed() ],
		host( &engine ),
	);

	let unit = loader.resolve( &IdentityName::new( "host.Only" ).unwrap() ).unwrap();
	assert!( unit.has_marker( "Host" ));
	assert_eq!( unit.origin(), &UnitOrigin::Host );
	// Host units are not registered as resolved by the loader.
	assert!( loader.registered( "host.Only" ).is_none() );

}

#[test]
fn precedence_registration_is_idempotent() {

	let engine = Engine::default();
	let loader = ModuleLoader::new(
		&engine,
		vec![ MemoryContainer::new( "fresh" ).with_unit( "shared.Unit", FRESH ).boxed() ],
		host( &engine ),
	);
	let name = IdentityName::new( "shared.Unit" ).unwrap();

	let first = loader.resolve( &name ).unwrap();
	let second = loader.resolve( &name ).unwrap();
	assert!( Arc::ptr_eq( &first, &second ));
	assert!( Arc::ptr_eq( &first, &loader.registered( "shared.Unit" ).unwrap() ));
	assert_eq!( loader.registered_units().len(), 1 );

}

#[test]
fn precedence_host_namespace_contents() {

	let engine = Engine::default();
	let host = host( &engine );
	assert_eq!( host.len(), 2 );
	assert!( !host.is_empty() );
	assert_eq!( host.units().map(| unit | unit.name().as_str() ).collect::<Vec<_>>(), vec![ "host.Only", "shared.Unit" ]);
	assert!( host.lookup( "nowhere.Unit" ).is_none() );

	let empty = HostNamespace::empty();
	assert_eq!( empty.len(), 0 );
	assert!( empty.is_empty() );

}
