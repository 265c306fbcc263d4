pub mod api;
pub mod calendar;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod payment;
pub mod pricing;
pub mod reaper;
