//! Build configuration.
//!
//! Configuration is usually read from a TOML file:
//!
//! ```toml
//! source_extension = "src"
//! artifact_extension = "wasm"
//! libraries = [ "lib/widgets", "lib/shared.zip" ]
//!
//! [compiler]
//! program = "srcc"
//! args = [ "--out", "{artifact}", "{source}" ]
//! timeout_ms = 30000
//! ```
//!
//! Every key is optional except `compiler.program` when a `[compiler]` section is present.

use std::path::{ Path, PathBuf };
use std::time::Duration ;
use serde::Deserialize ;
use thiserror::Error ;

use crate::compiler::DEFAULT_COMPILER_ARGS ;
use crate::loader::DEFAULT_ARTIFACT_EXTENSION ;



/// Default extension of source files.
pub const DEFAULT_SOURCE_EXTENSION: &str = "src" ;

/// Errors that can occur while reading configuration.
#[derive( Debug, Error )]
pub enum ConfigError {
	/// The configuration file could not be read.
	#[error( "Failed to read config '{}': {source}", path.display() )]
	Io { path: PathBuf, source: std::io::Error },
	/// The configuration is not valid TOML or doesn't match the expected shape.
	#[error( "Invalid config: {0}" )]
	Parse( #[from] toml::de::Error ),
	/// A build was requested from configuration that names no compiler.
	#[error( "No [compiler] section configured" )]
	MissingCompiler,
}

/// Settings of a [`BuildPipeline`]( crate::BuildPipeline ).
#[derive( Debug, Clone, PartialEq, Eq, Deserialize )]
#[serde( default, deny_unknown_fields )]
pub struct BuildConfig {
	source_extension: String,
	artifact_extension: String,
	compiler: Option<CompilerConfig>,
	libraries: Vec<PathBuf>,
}

impl Default for BuildConfig {
	fn default() -> Self {
		Self {
			source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
			artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
			compiler: None,
			libraries: Vec::with_capacity( 0 ),
		}
	}
}

impl BuildConfig {

	/// Parses configuration from TOML text.
	///
	/// # Errors
	/// [`ConfigError::Parse`] on malformed TOML or unknown keys.
	pub fn from_toml_str( text: &str ) -> Result<Self, ConfigError> {
		Ok( toml::from_str( text )? )
	}

	/// Reads and parses a TOML configuration file.
	///
	/// Relative library paths are resolved against the file's directory.
	///
	/// # Errors
	/// [`ConfigError::Io`] if the file can't be read, [`ConfigError::Parse`] if it is invalid.
	pub fn from_file( path: impl AsRef<Path> ) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string( path )
			.map_err(| source | ConfigError::Io { path: path.to_path_buf(), source })?;
		let mut config = Self::from_toml_str( &text )?;
		if let Some( base ) = path.parent() {
			config.libraries = config.libraries.into_iter().map(| library | base.join( library )).collect();
		}
		Ok( config )
	}

	/// Sets the extension of source files (without the dot).
	pub fn with_source_extension( mut self, extension: impl Into<String> ) -> Self {
		self.source_extension = extension.into();
		self
	}

	/// Sets the extension of compiled artifacts (without the dot).
	pub fn with_artifact_extension( mut self, extension: impl Into<String> ) -> Self {
		self.artifact_extension = extension.into();
		self
	}

	/// Sets the external compiler.
	pub fn with_compiler( mut self, compiler: CompilerConfig ) -> Self {
		self.compiler = Some( compiler );
		self
	}

	/// Appends a library container, consulted after the build's output root.
	pub fn with_library( mut self, path: impl Into<PathBuf> ) -> Self {
		self.libraries.push( path.into() );
		self
	}

	/// Extension of source files.
	#[inline] pub fn source_extension( &self ) -> &str { &self.source_extension }

	/// Extension of compiled artifacts.
	#[inline] pub fn artifact_extension( &self ) -> &str { &self.artifact_extension }

	/// The external compiler, if configured.
	#[inline] pub fn compiler( &self ) -> Option<&CompilerConfig> { self.compiler.as_ref() }

	/// Library containers, in lookup order.
	#[inline] pub fn libraries( &self ) -> &[PathBuf] { &self.libraries }

}

/// The `[compiler]` section: which program compiles a source file.
#[derive( Debug, Clone, PartialEq, Eq, Deserialize )]
#[serde( deny_unknown_fields )]
pub struct CompilerConfig {
	program: PathBuf,
	#[serde( default = "default_args" )]
	args: Vec<String>,
	#[serde( default )]
	timeout_ms: Option<u64>,
}

fn default_args() -> Vec<String> {
	DEFAULT_COMPILER_ARGS.iter().map(| arg | ( *arg ).to_string() ).collect()
}

impl CompilerConfig {

	/// A compiler running `program` with the default arguments and no timeout.
	pub fn new( program: impl Into<PathBuf> ) -> Self {
		Self { program: program.into(), args: default_args(), timeout_ms: None }
	}

	/// Replaces the argument templates.
	pub fn with_args( mut self, args: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		self.args = args.into_iter().map( Into::into ).collect();
		self
	}

	/// Sets the per-file time budget.
	pub fn with_timeout( mut self, timeout: Duration ) -> Self {
		self.timeout_ms = Some( u64::try_from( timeout.as_millis() ).unwrap_or( u64::MAX ));
		self
	}

	/// The program to run.
	#[inline] pub fn program( &self ) -> &Path { &self.program }

	/// Argument templates.
	#[inline] pub fn args( &self ) -> &[String] { &self.args }

	/// Per-file time budget.
	pub fn timeout( &self ) -> Option<Duration> { self.timeout_ms.map( Duration::from_millis ) }

}
