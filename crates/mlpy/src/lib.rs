//! mlpy: a capability-sandboxed source-to-source compiler for the ML
//! scripting language (spec.md `1`-`2`).
//!
//! This crate is the facade that wires the ten independent pass crates
//! (`mlpy_span`, `mlpy_ast`, `mlpy_parser`, `mlpy_semantic`,
//! `mlpy_codegen`, `mlpy_cache`, `mlpy_capability`, `mlpy_registry`,
//! `mlpy_sandbox`, `mlpy_sourcemap`) into the handful of entry points
//! external collaborators use: [`pipeline::compile`] for the CLI/build
//! pipeline, [`pipeline::compile_incremental`] for a REPL,
//! [`pipeline::diagnose`]/[`pipeline::hover`] for an LSP, and
//! [`pipeline::resolve`] for a DAP (spec.md `6`). It also owns the two
//! concerns spec.md names but leaves unimplemented elsewhere:
//! capability-requirement inference ([`capabilities`]) and the default
//! bridge-module registry ([`bridges`]).
//!
//! See `DESIGN.md` for how each module here is grounded in the
//! retrieval pack.

pub mod bridges;
pub mod capabilities;
pub mod pipeline;
pub mod records;

pub use pipeline::{audit, compile, compile_incremental, diagnose, hover, resolve, AnalysisMode, AuditReport, CompileOptions, CompileOutcome, DeepAnalysis, HoverInfo};
