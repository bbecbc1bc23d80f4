//! Per-file compilation.
//!
//! The pipeline hands every discovered source file to a [`Compiler`] along with the
//! output root and the exact artifact path it expects. [`ExternalCompiler`] runs a
//! program per file; hosts with an in-process toolchain implement [`Compiler`] directly.

use std::ffi::{ OsStr, OsString };
use std::io::Read ;
use std::path::{ Path, PathBuf };
use std::process::{ Child, Command, ExitStatus, Stdio };
use std::thread::JoinHandle ;
use std::time::{ Duration, Instant };
use thiserror::Error ;

use crate::config::CompilerConfig ;
use crate::identity::{ IdentityError, IdentityName };
use crate::source::SourceUnit ;



/// Arguments passed to an [`ExternalCompiler`] unless configured otherwise.
pub const DEFAULT_COMPILER_ARGS: [&str; 2] = [ "{artifact}", "{source}" ];

const POLL_INTERVAL: Duration = Duration::from_millis( 10 );

/// One compiler call: which source to compile and where its artifact must end up.
#[derive( Debug, Clone, Copy )]
pub struct Invocation<'a> {
	source: &'a SourceUnit,
	output_root: &'a Path,
	artifact: &'a Path,
}

impl<'a> Invocation<'a> {

	pub(crate) fn new( source: &'a SourceUnit, output_root: &'a Path, artifact: &'a Path ) -> Self {
		Self { source, output_root, artifact }
	}

	/// The source file to compile.
	#[inline] pub fn source( &self ) -> &'a SourceUnit { self.source }

	/// The output root of the current build.
	#[inline] pub fn output_root( &self ) -> &'a Path { self.output_root }

	/// Where the artifact is expected. Its parent directory already exists.
	#[inline] pub fn artifact( &self ) -> &'a Path { self.artifact }

}

/// Compiles a single source file into its artifact.
pub trait Compiler: Send + Sync {

	/// Compiles `invocation.source()` into `invocation.artifact()`.
	///
	/// # Errors
	/// Any failure is recorded against the source file; it never aborts the build.
	fn compile( &self, invocation: &Invocation<'_> ) -> Result<(), CompileError> ;

}

/// Why a single source file failed to compile.
#[derive( Debug, Error, Clone, PartialEq, Eq )]
pub enum CompileError {
	/// The file's path doesn't map to an identity, so it was never compiled.
	#[error( "Cannot derive identity: {0}" )]
	InvalidIdentity( IdentityError ),
	/// The compiler process could not be started.
	#[error( "Failed to start compiler '{program}': {reason}" )]
	Spawn { program: String, reason: String },
	/// Waiting on the compiler process failed.
	#[error( "Failed to wait for compiler: {0}" )]
	Wait( String ),
	/// The compiler ran and reported failure.
	#[error( "Compiler failed ({status}): {diagnostic}" )]
	Rejected { status: String, diagnostic: String },
	/// The compiler exceeded its time budget and was killed.
	#[error( "Compiler timed out after {0:?}" )]
	TimedOut( Duration ),
	/// The compiler reported success but left no artifact behind.
	#[error( "No artifact produced at '{}'", .0.display() )]
	MissingArtifact( PathBuf ),
	/// Diagnostic from an in-process compiler.
	#[error( "{0}" )]
	Diagnostic( String ),
}

/// A source file that produced no compiled identity.
#[derive( Debug, Error, Clone )]
#[error( "Failed to compile '{}': {error}", path.display() )]
pub struct CompileFailure {
	path: PathBuf,
	identity: Option<IdentityName>,
	#[source] error: CompileError,
}

impl CompileFailure {

	pub(crate) fn new( path: impl Into<PathBuf>, identity: Option<IdentityName>, error: CompileError ) -> Self {
		Self { path: path.into(), identity, error }
	}

	/// Path of the failed source file.
	#[inline] pub fn path( &self ) -> &Path { &self.path }

	/// The identity the file would have compiled to, if its path maps to one.
	#[inline] pub fn identity( &self ) -> Option<&IdentityName> { self.identity.as_ref() }

	/// What went wrong.
	#[inline] pub fn error( &self ) -> &CompileError { &self.error }

	/// Human readable diagnostic for display next to the file.
	pub fn diagnostic( &self ) -> String { self.error.to_string() }

}

/// Runs an external program once per source file.
///
/// Arguments are templates; these placeholders are substituted per invocation:
///
/// - `{source}`: path of the source file
/// - `{output}`: the build's output root
/// - `{artifact}`: the path the artifact must be written to
/// - `{identity}`: the dotted identity name
///
/// A file compiled successfully when the program exits with status zero and the
/// artifact exists. Whatever the program printed (stderr, or stdout if stderr is
/// empty) becomes the diagnostic of a failure.
///
/// On unix the program leads its own process group, and a timeout kills the whole
/// group, so wrapper scripts can't keep a build waiting.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct ExternalCompiler {
	program: PathBuf,
	args: Vec<String>,
	timeout: Option<Duration>,
}

impl ExternalCompiler {

	/// Creates a compiler running `program` with [`DEFAULT_COMPILER_ARGS`] and no timeout.
	pub fn new( program: impl Into<PathBuf> ) -> Self {
		Self {
			program: program.into(),
			args: DEFAULT_COMPILER_ARGS.iter().map(| arg | ( *arg ).to_string() ).collect(),
			timeout: None,
		}
	}

	/// Creates a compiler from its configuration section.
	pub fn from_config( config: &CompilerConfig ) -> Self {
		let compiler = Self::new( config.program() ).with_args( config.args() );
		match config.timeout() {
			Some( timeout ) => compiler.with_timeout( timeout ),
			None => compiler,
		}
	}

	/// Replaces the argument templates.
	pub fn with_args( mut self, args: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		self.args = args.into_iter().map( Into::into ).collect();
		self
	}

	/// Kills the program and fails the file if it runs longer than `timeout`.
	pub fn with_timeout( mut self, timeout: Duration ) -> Self {
		self.timeout = Some( timeout );
		self
	}

	/// The program being run.
	#[inline] pub fn program( &self ) -> &Path { &self.program }

	/// The argument templates.
	#[inline] pub fn args( &self ) -> &[String] { &self.args }

	/// The per-file time budget.
	#[inline] pub fn timeout( &self ) -> Option<Duration> { self.timeout }

}

impl Compiler for ExternalCompiler {

	fn compile( &self, invocation: &Invocation<'_> ) -> Result<(), CompileError> {

		let mut command = Command::new( &self.program );
		command
			.args( self.args.iter().map(| arg | expand_argument( arg, invocation )))
			.stdin( Stdio::null() )
			.stdout( Stdio::piped() )
			.stderr( Stdio::piped() );
		#[cfg( unix )]
		std::os::unix::process::CommandExt::process_group( &mut command, 0 );

		let mut child = command.spawn()
			.map_err(| err | CompileError::Spawn { program: self.program.display().to_string(), reason: err.to_string() })?;

		let stdout = drain( child.stdout.take() );
		let stderr = drain( child.stderr.take() );

		// A killed compiler's descendants may still hold the pipes, so the drains
		// are left to finish on their own.
		let status = match self.timeout {
			Some( timeout ) => wait_with_timeout( &mut child, timeout )?,
			None => child.wait().map_err(| err | CompileError::Wait( err.to_string() ))?,
		};

		let stdout = stdout.join().unwrap_or_default();
		let stderr = stderr.join().unwrap_or_default();

		match status.success() {
			true => Ok(()),
			false => Err( CompileError::Rejected {
				status: status.to_string(),
				diagnostic: match stderr.trim() {
					"" => stdout.trim().to_string(),
					diagnostic => diagnostic.to_string(),
				},
			}),
		}

	}

}

fn expand_argument( template: &str, invocation: &Invocation<'_> ) -> OsString {

	let placeholders = [
		( "{source}", invocation.source.path().as_os_str() ),
		( "{output}", invocation.output_root.as_os_str() ),
		( "{artifact}", invocation.artifact.as_os_str() ),
		( "{identity}", OsStr::new( invocation.source.identity().as_str() )),
	];

	// A lone placeholder is passed through untouched so non UTF-8 paths survive.
	if let Some(( _, value )) = placeholders.iter().find(|( key, _ )| *key == template ) {
		return value.to_os_string();
	}

	placeholders.iter()
		.fold( template.to_string(), | arg, ( key, value )| arg.replace( key, &value.to_string_lossy() ))
		.into()

}

fn drain( pipe: Option<impl Read + Send + 'static> ) -> JoinHandle<String> {
	std::thread::spawn( move || {
		let mut buffer = Vec::new();
		if let Some( Err( err )) = pipe.map(| mut pipe | pipe.read_to_end( &mut buffer )) {
			tracing::debug!( read = buffer.len(), "Compiler output truncated: {}", err );
		}
		String::from_utf8_lossy( &buffer ).into_owned()
	})
}

fn wait_with_timeout( child: &mut Child, timeout: Duration ) -> Result<ExitStatus, CompileError> {
	let deadline = Instant::now() + timeout ;
	loop {
		match child.try_wait() {
			Ok( Some( status )) => return Ok( status ),
			Ok( None ) if Instant::now() >= deadline => {
				kill_tree( child );
				let _ = child.wait();
				return Err( CompileError::TimedOut( timeout ));
			}
			Ok( None ) => std::thread::sleep( POLL_INTERVAL ),
			Err( err ) => return Err( CompileError::Wait( err.to_string() )),
		}
	}
}

/// Kills the compiler together with every process it started in its process group.
#[cfg( unix )]
fn kill_tree( child: &mut Child ) {
	match libc::pid_t::try_from( child.id() ) {
		// SAFETY: `kill` has no memory safety preconditions; the negated pid names
		// the process group the child leads since it was spawned with `process_group( 0 )`.
		Ok( pid ) if unsafe { libc::kill( -pid, libc::SIGKILL ) } == 0 => {}
		_ => { let _ = child.kill(); }
	}
}

#[cfg( not( unix ))]
fn kill_tree( child: &mut Child ) {
	let _ = child.kill();
}
