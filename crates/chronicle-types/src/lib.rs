//! Shared type definitions for the Chronicle store.
//!
//! This crate is the single source of truth for the types every other
//! Chronicle crate agrees on: the entity identifier and the contracts a
//! value must satisfy to live in a component table or a singleton slot.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for entity identifiers
//! - [`component`] -- The [`Component`] and [`Singleton`] contract traits
//!
//! [`Component`]: component::Component
//! [`Singleton`]: component::Singleton

pub mod component;
pub mod ids;

pub use component::{Component, Singleton};
pub use ids::EntityId;
