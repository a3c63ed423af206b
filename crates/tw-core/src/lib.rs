//! # tw-core
//!
//! Core types and error types for Trendwatch.
//!
//! This crate provides the foundational types shared across all Trendwatch crates:
//! - Entity structs for trends, scored items, section groups, and queue entries
//! - Closed enums for trend categories, queue status, and confidence levels
//! - Dedup key construction
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod keys;
