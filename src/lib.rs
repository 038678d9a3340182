pub mod adapter;
pub mod data_models;
pub mod error;
pub mod mercari;
pub mod signing;

pub use adapter::{Marketplace, RawResponse};
pub use data_models::{Item, SearchParams, SearchResults};
pub use error::{Error, Result};
pub use mercari::Mercari;
pub use signing::DpopSigner;
