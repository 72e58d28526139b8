//! services/api/src/lib.rs
//!
//! The local MathMentor service: configuration, the adapters that back the
//! core ports, and the HTTP surface the dashboard talks to.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
