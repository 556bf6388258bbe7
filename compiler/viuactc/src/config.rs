//! Compiler configuration.

use viuact_diagnostic::emitter::ColorMode;
use viuact_emit::EmitOptions;

/// How one module is compiled and reported.
///
/// Every switch is explicit; the driver reads no environment state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompilerConfig {
    /// The module is the program entry point. Its functions are not
    /// qualified by the module name.
    pub executable: bool,
    /// Emit `;` comments describing the instructions that follow.
    pub annotate: bool,
    /// Compile the functions of a module on the rayon pool.
    pub parallel: bool,
    /// Color of rendered diagnostics.
    pub color: ColorMode,
}

impl CompilerConfig {
    /// Configuration for the executable module.
    pub fn executable() -> Self {
        CompilerConfig {
            executable: true,
            ..CompilerConfig::default()
        }
    }

    /// Configuration for a library module.
    pub fn library() -> Self {
        CompilerConfig::default()
    }

    #[must_use]
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            annotate: self.annotate,
        }
    }
}
