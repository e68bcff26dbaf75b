//! Test modules relocated from implementation files.
//!
//! Suites covering whole-program behavior are too large for inline
//! `#[cfg(test)]` modules, so they live here. The [`build`] module plays
//! the part of the external parser: hand-assembled trees over a shared
//! interner.


mod control_tests;
