//! Core invoice types, calculation, validation and assembly.
//!
//! This module provides the EN 16931 domain model used by Factur-X,
//! the totals/VAT calculator and the request-to-invoice pipeline.

mod builder;
mod business;
mod calculator;
pub mod countries;
pub mod currencies;
mod error;
mod numbering;
mod request;
mod store;
mod types;
mod validation;

pub use builder::*;
pub use business::*;
pub use calculator::*;
pub use countries::CountryCode;
pub use currencies::CurrencyCode;
pub use error::*;
pub use numbering::*;
pub use request::*;
pub use store::*;
pub use types::*;
pub use validation::*;
