#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for chicory.
//!
//! Pure helpers with no logging/tracing dependencies. Logging belongs to the
//! CLI crate so the libraries stay lightweight.

pub mod fs;
pub mod hash;
