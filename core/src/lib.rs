//! Pull-cost models for gacha banners: exact expectations from absorbing
//! Markov chains and Monte Carlo distributions from the same rules.

pub mod api;
pub mod banner;
pub mod config;
pub mod error;
pub mod expectation;
pub mod markov;
pub mod registry;
pub mod rng;
pub mod simulation;
pub mod state;
pub mod stats;
pub mod types;

pub use api::{run, Mode, Request, Response};
pub use error::{GachaError, GachaResult};
