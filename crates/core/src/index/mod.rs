//! Vector index
//!
//! A single index type lives here: [`SlotIndex`], an append-only exact-search
//! store. Every appended embedding occupies a *slot*: an integer assigned at
//! append time, monotonically increasing, never reused. There is no deletion
//! or in-place update; corrections go through a full rebuild, which reassigns
//! slots from zero.

pub mod flat;

pub use flat::SlotIndex;
