//! Core business logic for the markaz enrollment service.

pub mod services;

pub use services::*;
