//! Core module - Contains the fundamental data structures and utilities
//!
//! This module provides:
//! - Unified result model (ResultItem)
//! - Rendering functions for different output formats
//! - Path resolution for input/output documents
//! - Document reading and writing
//! - The error taxonomy

pub mod error;
pub mod file_reader;
pub mod model;
pub mod paths;
pub mod render;
pub mod util;
