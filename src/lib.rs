//! An interpreter, ahead-of-time peephole optimizer, and execution profiler
//! for the eight-symbol tape language.
//!
//! A program flows through the crate as: raw text → [`SourceProgram`]
//! (token filter) → [`optimize`] (idiom fusion and run-length compression)
//! → opcode stream → [`run`] (the machine) → final tape, output bytes, and
//! per-position counts → [`profile`]. Optimized streams persist as a
//! single-line text form via [`encode`]/[`decode`] and can be executed
//! directly without re-optimizing.
//!
//! Optimization never changes observable behavior: for any program and any
//! level, the output bytes and the touched tape prefix match the
//! unoptimized run.

pub mod inst;
pub mod machine;
pub mod optimize;
pub mod profile;
pub mod source;

pub use inst::{DecodeError, Dir, Inst, decode, encode};
pub use machine::{
    DEFAULT_LIMIT, HaltReason, OutputSink, RunResult, TraceFrame, TraceHook, run,
};
pub use optimize::{OptLevel, optimize};
pub use profile::{ProfileGroup, profile};
pub use source::SourceProgram;
