//! Core business logic for the CityFix report lifecycle.
//!
//! The three cooperating pieces are the lifecycle engine
//! ([`services::lifecycle`] + [`services::ReportService`]), the
//! duplicate-merge propagator ([`services::DuplicateSyncService`]), and the
//! notification fan-out ([`services::NotificationFanoutService`]).

pub mod services;

pub use services::*;
