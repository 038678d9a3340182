use std::future::Future;

use serde::Serialize;

use crate::data_models::{Item, SearchParams};
use crate::error::Result;

/// Body of a successful search response, as returned by
/// [`Marketplace::fetch`]. The status is always the accepted success code;
/// anything else fails the fetch before a `RawResponse` exists.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Capability contract every marketplace integration satisfies.
///
/// Conformance is structural: each marketplace owns its payload shape,
/// auth scheme and field mapping, but exposes the same operations so
/// callers can treat integrations interchangeably.
pub trait Marketplace {
    /// Vendor-specific request structure posted by [`Marketplace::fetch`].
    type Query: Serialize;

    /// Project normalized parameters into the vendor request structure.
    ///
    /// All parameter validation surfaces here as
    /// [`Error::InvalidArgument`](crate::error::Error::InvalidArgument),
    /// before any network call.
    fn extract_params(&self, params: &SearchParams) -> Result<Self::Query>;

    /// Perform one search request, yielding the caller during the wait.
    fn fetch(&self, params: &SearchParams) -> impl Future<Output = Result<RawResponse>> + Send;

    /// Perform one search request, occupying the calling thread until the
    /// response arrives. Same payload construction, same outcome as
    /// [`Marketplace::fetch`].
    fn fetch_blocking(&self, params: &SearchParams) -> Result<RawResponse>;

    /// Validate and reshape a raw response into canonical items.
    ///
    /// Zero items is a valid outcome. One malformed entry fails the whole
    /// call: a partially validated page would silently change result
    /// semantics for callers that count or index results.
    fn parse(&self, response: &RawResponse) -> Result<Vec<Item>>;
}
