//! Application services: the post adapter, authoring, contact and access rules.

pub mod access;
pub mod admin;
pub mod contact;
pub mod editor;
pub mod error;
pub mod posts;
pub mod preview;
pub mod repos;
pub mod sanitize;
