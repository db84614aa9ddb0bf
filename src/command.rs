use crate::external::{ExternalError, PackageManager, Runtime};
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Capability the interpreter uses to reach other language toolchains.
///
/// The interpreter decides *what* to run (it resolves the language tag into a
/// [`Runtime`] or a [`PackageManager`] and reports unsupported tags itself);
/// the bridge decides *how*. [`crate::ProcessBridge`] spawns real processes,
/// tests plug in recording stubs.
pub trait ExternalBridge {
    /// Install `module` with the given package manager.
    ///
    /// `stdout` is the interpreter's output stream; implementations that print
    /// anything themselves write it there.
    fn install(
        &mut self,
        manager: PackageManager,
        module: &str,
        stdout: &mut dyn Write,
    ) -> Result<ExitCode, ExternalError>;

    /// Run `code` inline with the given language runtime.
    fn run(
        &mut self,
        runtime: Runtime,
        code: &str,
        stdout: &mut dyn Write,
    ) -> Result<ExitCode, ExternalError>;
}
