//! corral-match — constraint expression engines for the placement core.
//!
//! Two small, self-contained languages that callers embed in request
//! payloads (they are part of the wire contract and must parse exactly):
//!
//! - **`ops`** — the scoped-key operator grammar. A declared constraint
//!   string (`">= 1024"`, `"<or> kvm <or> qemu"`, `"x86_64"`) is parsed
//!   once into a [`Requirement`] and matched against host-derived values.
//! - **`query`** — a JSON-style boolean query language over nested
//!   `[op, operand, ...]` arrays, with `$field` references resolved
//!   against host-state fields.
//!
//! Both engines are purely functional: no external state, and malformed
//! input evaluates to a non-match rather than an error, so one bad
//! constraint never aborts an unrelated scheduling call.

pub mod ops;
pub mod query;

pub use ops::Requirement;
pub use query::evaluate;
