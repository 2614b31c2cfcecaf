//! Arcade top-down car server: two driving models (force-drift and kinematic
//! gear) sharing a gear table, hosted in a zero-gravity rapier world and
//! served to browser clients over websockets.

pub mod arcade;
pub mod config;
pub mod input;
pub mod net;
pub mod protocol;
pub mod spawn;
pub mod state;
pub mod vehicle;
pub mod world;
