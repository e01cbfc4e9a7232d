//! Solar Leveling marketing site, blog and admin panel.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
