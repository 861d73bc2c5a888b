//! Diagnostics and observability.
//!
//! This module provides:
//! - **Coded diagnostics**: contract violations and budget warnings with codes
//! - **Strict mode**: optional panic-on-error for CI
//! - **Event hooks**: listeners for client and pass events
//! - **Profiler integration**: Tracy plots behind the `tracy` feature
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | GM0xx | Client lifecycle issues        |
//! | GM2xx | Sequence affinity issues       |
//! | GM3xx | Budget/limit issues            |
//! | GM9xx | Internal errors                |

pub mod emit;
pub mod hooks;
pub mod kind;
pub mod macros;
pub mod strict;
pub mod tracy;

pub use emit::{emit, emit_with_context, set_sink, suppress_diagnostics, CollectingSink, DiagnosticSink};
pub use hooks::{ArbiterEvent, DiagnosticsHooks};
pub use kind::{Diagnostic, DiagnosticKind};
pub use kind::{GM001, GM002, GM201, GM301, GM302, GM901};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};
