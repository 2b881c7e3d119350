//! Label Dates Library
//!
//! Rewrites the printed "Best if used by:" date on PDF product labels.
//! This library provides functionality to:
//! - Compute best-by dates from a shelf life, rounded to the 1st or 15th
//! - Locate lead-in phrases in laid-out PDF text, including rotated labels
//! - Erase a matched span and draw the replacement in place
//! - Archive, rewrite and republish every label of a product through a
//!   document store
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use label_dates::config::ProductConfig;
//! use label_dates::store::DirectoryStore;
//! use label_dates::batch::run_all;
//!
//! let products = vec![ProductConfig::new("Fudge", 60, "fudge", "fudge-archive")];
//! let mut store = DirectoryStore::new("/srv/labels");
//! let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//!
//! let report = run_all(&mut store, &products, today).expect("invalid configuration");
//! assert!(report.is_success());
//! ```

pub mod batch;
pub mod config;
pub mod date;
pub mod error;
pub mod layout;
pub mod pdf;
pub mod store;

// Re-export commonly used items
pub use error::{Error, Result};
