#![cfg( unix )]

use std::sync::Arc ;
use std::time::{ Duration, Instant };
use wasm_hotload::{ BuildConfig, BuildPipeline, CompileError, CompilerConfig, Engine, ExternalCompiler, HostNamespace };
use crate::fixtures::{ names, write_tree };

fn pipeline( engine: &Engine, compiler: CompilerConfig ) -> BuildPipeline {
	let config = BuildConfig::default().with_compiler( compiler );
	BuildPipeline::from_config( engine, Arc::new( HostNamespace::empty() ), config ).unwrap()
}

#[test]
fn external_compiler_copies_text_units() {

	let engine = Engine::default();
	let output = tempfile::tempdir().unwrap();
	let compiler = CompilerConfig::new( "sh" ).with_args([ "-c", r#"cp "$0" "$1""#, "{source}", "{artifact}" ]);

	let result = pipeline( &engine, compiler ).build( &fixture_path!(), output.path() ).unwrap();
	assert!( result.is_clean() );
	assert_eq!( names( result.index().by_marker( "Tool" )), vec![ "a.Copied" ]);

}

#[test]
fn external_compiler_substitutes_placeholders() {

	let engine = Engine::default();
	let output = tempfile::tempdir().unwrap();
	let compiler = CompilerConfig::new( "sh" ).with_args([
		"-c",
		r#"test "$2" = "a.Copied" && test "$1" = "$3/a/Copied.wasm" && cp "$0" "$1""#,
		"{source}", "{artifact}", "{identity}", "{output}",
	]);

	let result = pipeline( &engine, compiler ).build( &fixture_path!(), output.path() ).unwrap();
	assert!( result.is_clean(), "{:?}", result.failed_sources() );

}

#[test]
fn external_compiler_failure_carries_diagnostic() {

	let engine = Engine::default();
	let output = tempfile::tempdir().unwrap();
	let compiler = CompilerConfig::new( "sh" ).with_args([ "-c", "echo 'syntax error at 1:1' >&2; exit 3" ]);

	let result = pipeline( &engine, compiler ).build( &fixture_path!(), output.path() ).unwrap();
	match result.failed_sources() {
		[ failure ] => match failure.error() {
			CompileError::Rejected { diagnostic, .. } => assert_eq!( diagnostic, "syntax error at 1:1" ),
			err => panic!( "Unexpected error: {}", err ),
		},
		failures => panic!( "Unexpected failures: {:?}", failures ),
	}

}

#[test]
fn external_compiler_timeout_fails_only_that_file() {

	let engine = Engine::default();
	let sources = tempfile::tempdir().unwrap();
	let output = tempfile::tempdir().unwrap();
	write_tree( sources.path(), &[( "a/Fast.src", "(module)" ), ( "a/Slow.src", "(module)" )]);
	let compiler = CompilerConfig::new( "sh" )
		.with_args([ "-c", r#"case "$0" in *Slow*) exec sleep 5 ;; esac; cp "$0" "$1""#, "{source}", "{artifact}" ])
		.with_timeout( Duration::from_millis( 200 ));

	let result = pipeline( &engine, compiler ).build( sources.path(), output.path() ).unwrap();
	assert_eq!( names( result.compiled_identities() ), vec![ "a.Fast" ]);
	match result.failed_sources() {
		[ failure ] => {
			assert_eq!( failure.identity().map(| name | name.as_str() ), Some( "a.Slow" ));
			assert_eq!( failure.error(), &CompileError::TimedOut( Duration::from_millis( 200 )));
		}
		failures => panic!( "Unexpected failures: {:?}", failures ),
	}

}

#[test]
fn external_compiler_missing_program() {

	let engine = Engine::default();
	let output = tempfile::tempdir().unwrap();
	let compiler = ExternalCompiler::new( "/nonexistent/compiler" );
	let pipeline = BuildPipeline::new( &engine, Arc::new( HostNamespace::empty() ), compiler, BuildConfig::default() );

	let result = pipeline.build( &fixture_path!(), output.path() ).unwrap();
	match result.failed_sources() {
		[ failure ] => assert!( matches!( failure.error(), CompileError::Spawn { .. })),
		failures => panic!( "Unexpected failures: {:?}", failures ),
	}

}

#[test]
fn external_compiler_rejected_artifact_is_discarded() {

	let engine = Engine::default();
	let output = tempfile::tempdir().unwrap();
	let compiler = CompilerConfig::new( "sh" ).with_args([ "-c", r#"cp "$0" "$1"; echo 'half done' >&2; exit 1"#, "{source}", "{artifact}" ]);

	let result = pipeline( &engine, compiler ).build( &fixture_path!(), output.path() ).unwrap();
	assert_eq!( result.failed_sources().len(), 1 );
	assert!( !output.path().join( "a" ).join( "Copied.wasm" ).exists() );
	assert!( result.index().get( "a.Copied" ).is_none() );

}

#[test]
fn external_compiler_timeout_kills_descendants() {

	let engine = Engine::default();
	let sources = tempfile::tempdir().unwrap();
	let output = tempfile::tempdir().unwrap();
	write_tree( sources.path(), &[( "a/Slow.src", "(module)" )]);
	// The sleep runs in a forked child holding the output pipes, not in the shell itself.
	let compiler = CompilerConfig::new( "sh" )
		.with_args([ "-c", r#"echo compiling; sleep 4; cp "$0" "$1"; echo done"#, "{source}", "{artifact}" ])
		.with_timeout( Duration::from_millis( 200 ));

	let started = Instant::now();
	let result = pipeline( &engine, compiler ).build( sources.path(), output.path() ).unwrap();
	assert!( started.elapsed() < Duration::from_secs( 3 ), "Build took {:?}", started.elapsed() );

	match result.failed_sources() {
		[ failure ] => assert_eq!( failure.error(), &CompileError::TimedOut( Duration::from_millis( 200 ))),
		failures => panic!( "Unexpected failures: {:?}", failures ),
	}
	assert!( result.compiled_identities().next().is_none() );
	assert!( !output.path().join( "a" ).join( "Slow.wasm" ).exists() );

}
