//! Permission system gating command dispatch.
//!
//! Pure predicates over a resolved context and a handler's declared
//! requirements. No I/O here; the resolver supplies the facts, the
//! router sends the denial reply.

mod policy;

pub use policy::{evaluate, Denial, Requirements};
