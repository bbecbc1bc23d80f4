use std::sync::Arc ;
use std::sync::mpsc ;
use wasm_hotload::{ BuildConfig, BuildError, BuildPipeline, Engine, HostNamespace, Workspace };
use crate::compilers::GateCompiler ;
use crate::fixtures::write_tree ;

#[test]
fn serialised_builds_reject_or_queue() {

	let engine = Engine::default();
	let sources = tempfile::tempdir().unwrap();
	let output = tempfile::tempdir().unwrap();
	write_tree( sources.path(), &[( "a/One.src", "(module)" )]);

	let ( started_tx, started ) = mpsc::channel();
	let ( release, release_rx ) = mpsc::channel();
	let pipeline = BuildPipeline::new(
		&engine,
		Arc::new( HostNamespace::empty() ),
		GateCompiler::new( started_tx, release_rx ),
		BuildConfig::default(),
	);
	let workspace = Workspace::new( pipeline, sources.path(), output.path() );

	std::thread::scope(| scope | {

		let build = scope.spawn(|| workspace.rebuild() );
		started.recv().unwrap();
		release.send(()).unwrap();
		let first = build.join().unwrap().unwrap();
		assert_eq!( workspace.current().unwrap().id(), 1 );

		let build = scope.spawn(|| workspace.rebuild() );
		started.recv().unwrap();

		// Mid-build: the previous generation is retired and nothing is published.
		assert!( first.generation().is_retired() );
		assert!( workspace.current().is_none() );
		assert!( matches!( workspace.try_rebuild(), Err( BuildError::BuildInProgress )));

		// A queued rebuild waits for the running one, then compiles after it.
		let queued = scope.spawn(|| workspace.rebuild() );
		release.send(()).unwrap();
		let second = build.join().unwrap().unwrap();
		assert_eq!( second.generation().id(), 2 );

		started.recv().unwrap();
		release.send(()).unwrap();
		let third = queued.join().unwrap().unwrap();
		assert_eq!( third.generation().id(), 3 );
		assert!( second.generation().is_retired() );

	});

	assert_eq!( workspace.current().unwrap().id(), 3 );

}
