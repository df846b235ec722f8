//! Trip lifecycle workflow and rate resolution for a quarry logistics back office.
//!
//! [`workflow::TripStateMachine`] decides which actions a role may take on a
//! trip and what each one changes; [`rate::RateResolver`] prices a trip once,
//! when it is created. [`service::TripService`] ties both to storage.

pub mod activity;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod notification;
pub mod rate;
pub mod service;
pub mod store;
pub mod trip;
pub mod types;
pub mod utils;
pub mod wire;
pub mod workflow;
