//! Per-module compilation.

use std::io::Write;
use std::sync::Arc;

use rayon::prelude::*;
use viuact_diagnostic::emitter::{DiagnosticEmitter, TerminalEmitter};
use viuact_diagnostic::Diagnostic;
use viuact_emit::{
    compile_function, CompiledFunction, EmitContext, EmitError, InterfaceSource, ModuleView,
};
use viuact_ir::{FnDef, SourceModule, StringInterner};

use crate::CompilerConfig;

/// Every function of one module, compiled.
#[derive(Debug)]
pub struct CompiledModule {
    pub name: String,
    pub executable: bool,
    /// Declarations of the module; publish it to let other modules import it.
    pub view: Arc<ModuleView>,
    /// Top-level functions in definition order.
    pub functions: Vec<CompiledFunction>,
}

/// A module that did not compile.
///
/// Functions are compiled independently, so one failure does not hide the
/// errors of the others.
#[derive(Debug, thiserror::Error)]
#[error("module `{module}` failed to compile with {} error(s)", .diagnostics.len())]
pub struct CompileFailure {
    pub module: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileFailure {
    fn new(module: &SourceModule, diagnostics: Vec<Diagnostic>) -> Self {
        CompileFailure {
            module: module.name.clone(),
            diagnostics,
        }
    }

    /// Emit every diagnostic followed by the summary line.
    pub fn report(&self, emitter: &mut dyn DiagnosticEmitter) {
        emitter.emit_all(&self.diagnostics);
        let errors = self.diagnostics.iter().filter(|d| d.is_error()).count();
        emitter.emit_summary(errors, self.diagnostics.len() - errors);
        emitter.flush();
    }

    /// Render the report with a terminal emitter writing to `writer`.
    pub fn write_report<W: Write>(&self, writer: W, config: &CompilerConfig, is_tty: bool) -> W {
        let mut emitter = TerminalEmitter::with_color_mode(writer, config.color, is_tty);
        self.report(&mut emitter);
        emitter.into_inner()
    }
}

/// Compile every function of `module`.
///
/// Imports resolve through `interfaces`. With [`CompilerConfig::parallel`]
/// the functions are compiled on the rayon pool over the shared module view;
/// the result is the same either way.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn compile_module(
    module: &SourceModule,
    interner: &StringInterner,
    interfaces: &dyn InterfaceSource,
    config: &CompilerConfig,
) -> Result<CompiledModule, CompileFailure> {
    let view = ModuleView::build(module, interner, config.executable, interfaces)
        .map(Arc::new)
        .map_err(|err| CompileFailure::new(module, vec![err.to_diagnostic()]))?;
    let ctx = EmitContext::new(interner, &view, &module.arena).with_options(config.emit_options());

    let defs: Vec<&FnDef> = module.functions().collect();
    let results: Vec<Result<CompiledFunction, EmitError>> = if config.parallel {
        defs.par_iter().map(|def| compile_function(&ctx, def)).collect()
    } else {
        defs.iter().map(|def| compile_function(&ctx, def)).collect()
    };

    let mut functions = Vec::with_capacity(results.len());
    let mut diagnostics = Vec::new();
    for (def, result) in defs.iter().zip(results) {
        match result {
            Ok(function) => functions.push(function),
            Err(err) => {
                let function = format!("{}/{}", interner.lookup(def.name), def.arity());
                tracing::debug!(%function, code = %err.code(), "function rejected");
                diagnostics.push(err.to_diagnostic().in_function(function));
            }
        }
    }
    if !diagnostics.is_empty() {
        return Err(CompileFailure::new(module, diagnostics));
    }

    tracing::debug!(functions = functions.len(), "module compiled");
    Ok(CompiledModule {
        name: module.name.clone(),
        executable: config.executable,
        view,
        functions,
    })
}
