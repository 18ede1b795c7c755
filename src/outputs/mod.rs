//! Output generation for finished runs.
//!
//! - [`json`]: writes the [`RunReport`](crate::models::RunReport) to a dated JSON file
//! - [`summary`]: renders ranked plain-text tables for the terminal
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── 081500.json
//!     └── 173042.json
//! ```

pub mod json;
pub mod summary;
