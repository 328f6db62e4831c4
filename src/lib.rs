//! # facturx
//!
//! Factur-X e-invoicing: EN 16931 invoice model, UN/CEFACT CII XML,
//! PDF/A-3 embedding and compliance validation.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use facturx::core::*;
//!
//! let invoice = create_invoice(
//!     &sample_request(),
//!     &BusinessConfiguration::default(),
//!     "FX-2024-000001",
//!     NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
//! )
//! .unwrap();
//!
//! let xml = facturx::cii::to_cii_xml(&invoice).unwrap();
//! assert!(facturx::cii::validate_xml_structure(&xml).is_valid);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice types, totals, validation, numbering, store |
//! | `cii` (default) | CII XML generation, structure check, level detection |
//! | `pdf` (default) | PDF/A-3 embedding and extraction, summary renderer |
//! | `compliance` (default) | veraPDF/fallback validation, generation pipeline, settings |
//! | `cli` (default) | `facturx` command-line tool |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "cii")]
pub mod cii;

#[cfg(feature = "pdf")]
pub mod facturx;

#[cfg(feature = "compliance")]
pub mod compliance;

#[cfg(feature = "compliance")]
pub mod config;

#[cfg(feature = "core")]
pub use crate::core::*;
