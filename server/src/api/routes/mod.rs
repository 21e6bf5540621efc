//! API route handlers

pub mod admin;
pub mod counter;
pub mod health;
