//! Secret masking.
//!
//! Passwords are written verbatim into generated response files, which the
//! installer requires. Everywhere else (log lines, echoed commands, failure
//! messages) they pass through an [`OutputMasker`] first.

pub mod mask;

pub use mask::OutputMasker;
