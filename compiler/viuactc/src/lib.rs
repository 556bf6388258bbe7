//! Viuact compiler driver.
//!
//! Takes parsed modules to VM assembly:
//!
//! ```text
//! SourceModule ──► ModuleView::build ──► compile_function (per function,
//!     │                 ▲                 optionally on the rayon pool)
//!     │                 │                        │
//!     │         InterfaceRegistry                ▼
//!     │         (imported views)          CompiledModule ──► render()
//!     ▼                                          │
//! CompileFailure ──► TerminalEmitter             └──► InterfaceRegistry::publish
//! ```
//!
//! Lexing, parsing and module discovery happen before the driver; callers
//! hand it [`SourceModule`](viuact_ir::SourceModule)s and decide which
//! interfaces are visible through an [`InterfaceRegistry`].

mod compile;
mod config;
mod registry;
mod render;

use std::sync::Once;

pub use compile::{compile_module, CompileFailure, CompiledModule};
pub use config::CompilerConfig;
pub use registry::InterfaceRegistry;

static TRACING_INIT: Once = Once::new();

/// Install the tracing subscriber.
///
/// Does nothing unless `RUST_LOG` is set, e.g.
/// `RUST_LOG=viuact_emit=trace` to follow unification and slot allocation.
/// Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}
