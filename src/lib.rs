#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::ignored_unit_patterns
)]

pub mod config;
pub mod controller;
pub mod daemon;
pub mod display;
pub mod error;
pub mod event;
pub mod input;
pub mod mixer;
pub mod process;
pub mod render;
pub mod station;
pub mod web;

#[cfg(test)]
mod testing;
