//! Landgrab - authoritative rule engine for a turn-based territory conquest game

pub mod alliance;
pub mod combat;
pub mod core;
pub mod game;
pub mod map;
pub mod mapgen;
pub mod rules;
pub mod server;
pub mod trade;
