//! run-scheduler core
//!
//! Prepares solver input for a multi-day relay run schedule and turns the
//! models the solver reports back into saved, human-readable schedules.
//!
//! Routes and exchanges are loaded by [`loader`], compiled into facts by
//! [`compiler`], handed to a [`traits::Solver`], and every model is
//! processed by [`processor`] into a [`store::Solution`].

pub mod compiler;
pub mod config;
pub mod domain;
pub mod extract;
pub mod facts;
pub mod format;
pub mod haversine;
pub mod loader;
pub mod matrix;
pub mod polyline;
pub mod precision;
pub mod processor;
pub mod store;
pub mod traits;
