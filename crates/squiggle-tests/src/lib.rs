//! Integration test suite for the Squiggle distribution planner.
//!
//! Exercises the whole pipeline from allocation table to compiled plan,
//! checking conservation, ordering and determinism on both hand-built and
//! randomized tables.

pub mod helpers;
