//! Persistence for the three engine artifacts
//!
//! The catalog document, the identity map, and the vector blob live as
//! separate files under one data directory. Every write goes through a
//! temp-file-then-rename step so a crash never corrupts a published file,
//! and whole-state persists stage all three temp files before renaming any
//! of them.

pub mod file;

pub use file::ArtifactStore;
