//! Rebuildable WebAssembly extension units with layered name resolution and
//! capability discovery.
//!
//! A host application lets users author extensions as source files. `wasm_hotload`
//! compiles the whole source tree into WebAssembly units, loads them through a
//! resolver that always prefers freshly built units over the host's own, and indexes
//! them so the host can find extensions by declared marker or by type relationship.
//! Every rebuild produces a new, independent generation that fully replaces the last.
//!
//! # Core Concepts
//!
//! - [`IdentityName`]: The dotted name of a unit, derived from its source file's path
//! 	relative to the source root (`tools/Brush.src` is `tools.Brush`).
//!
//! - [`Container`]: A byte lookup keyed by resource name (`tools/Brush.wasm`). Either
//! 	a [`DirectoryContainer`] or an [`ArchiveContainer`] over a zip file.
//!
//! - [`HostNamespace`]: The host's pre-existing units. Consulted only for names no
//! 	container supplies, so user code always shadows host code of the same name.
//!
//! - [`ModuleLoader`]: Resolves names over an ordered container list with the host
//! 	namespace as fallback, caching whether a name was found or not. A loader is
//! 	one generation: its classifications never change.
//!
//! - [`LoadedUnit`]: A validated and linked unit. Units declare **markers** and a
//! 	**supertype** in custom sections (see [`MARKER_SECTION`] and [`EXTENDS_SECTION`])
//! 	and depend on other units by importing from them.
//!
//! - [`BuildPipeline`]: Clears the output root, compiles every source with a
//! 	[`Compiler`], resolves the results and produces a [`BuildResult`]. Broken files
//! 	are reported, never fatal.
//!
//! - [`CapabilityIndex`]: Answers [`by_marker`]( CapabilityIndex::by_marker ),
//! 	[`by_type`]( CapabilityIndex::by_type ) and
//! 	[`source_file_of`]( CapabilityIndex::source_file_of ) for one generation.
//!
//! - [`Workspace`]: Serialises rebuilds of one source tree and publishes each new
//! 	[`Generation`] atomically.
//!
//! # Re-exports
//!
//! `wasm_hotload` re-exports [`Engine`] from `wasmtime` for convenience. Every unit
//! of a generation, host units included, must be compiled with the same engine.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use wasm_hotload::{ Engine, HostNamespace, IdentityName, ModuleLoader };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::default();
//!
//! // Host units are defined once, before any build, and may extend each other.
//! let host = HostNamespace::builder( &engine )
//! 	.define( "core.Tool", r#"(module (@custom "hotload.marker" "Builtin"))"# )?
//! 	.define( "core.Brush", r#"(module (@custom "hotload.extends" "core.Tool"))"# )?
//! 	.build();
//!
//! // A loader without containers resolves everything through the host namespace.
//! let loader = ModuleLoader::new( &engine, Vec::new(), Arc::new( host ));
//! let brush = loader.resolve( &IdentityName::new( "core.Brush" )? )?;
//! assert!( brush.is_subtype_of( "core.Tool" ));
//! assert!( brush.supertype().is_some_and(| tool | tool.has_marker( "Builtin" )));
//! # Ok(())
//! # }
//! ```
//!
//! # Building
//!
//! ```no_run
//! use std::sync::Arc ;
//! use wasm_hotload::{ BuildConfig, BuildPipeline, CompilerConfig, Engine, HostNamespace, Workspace };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::default();
//! let config = BuildConfig::default()
//! 	.with_compiler( CompilerConfig::new( "srcc" ).with_args([ "-o", "{artifact}", "{source}" ]));
//! let pipeline = BuildPipeline::from_config( &engine, Arc::new( HostNamespace::empty() ), config )?;
//! let workspace = Workspace::new( pipeline, "extensions", "target/extensions" );
//!
//! let result = workspace.rebuild()?;
//! for failure in result.failed_sources() {
//! 	eprintln!( "{}: {}", failure.path().display(), failure.diagnostic() );
//! }
//!
//! if let Some( generation ) = workspace.current() {
//! 	for tool in generation.index().by_marker( "Tool" ) {
//! 		println!( "{} from {:?}", tool.name(), tool.source_file() );
//! 	}
//! }
//! # Ok(())
//! # }
//! ```

mod identity ;
mod container ;
mod unit ;
mod loader ;
mod host ;
mod source ;
mod compiler ;
mod config ;
mod pipeline ;
mod index ;
mod workspace ;
mod utils ;

#[doc( no_inline )]
pub use wasmtime::Engine ;

pub use identity::{ IdentityName, IdentityError };
pub use container::{ Container, ContainerError, DirectoryContainer, ArchiveContainer, open_container };
pub use unit::{ LoadedUnit, LinkageError, UnitOrigin, MARKER_SECTION, EXTENDS_SECTION };
pub use loader::{ ModuleLoader, ResolveError, Classification, LoaderStats, DEFAULT_ARTIFACT_EXTENSION };
pub use host::{ HostNamespace, HostNamespaceBuilder, HostDefinitionError };
pub use source::{ SourceUnit, DiscoveryIssue, discover_sources };
pub use compiler::{ Compiler, CompileError, CompileFailure, ExternalCompiler, Invocation, DEFAULT_COMPILER_ARGS };
pub use config::{ BuildConfig, CompilerConfig, ConfigError, DEFAULT_SOURCE_EXTENSION };
pub use pipeline::{ BuildPipeline, BuildResult, BuildError, BuildWarning, LinkFailure };
pub use index::{ CapabilityIndex, CompiledIdentity };
pub use workspace::{ Generation, Workspace };
pub use utils::PartialSuccess ;
