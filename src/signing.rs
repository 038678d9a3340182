use crate::error::Result;

/// Signing collaborator producing the proof-of-possession header value.
///
/// The token binds one request to a URL + HTTP method pair. Key material
/// and the signature scheme live with the implementor; adapters only call
/// this at header-construction time with the exact URL they are about to
/// hit.
pub trait DpopSigner {
    fn proof_token(&self, url: &str, method: &str) -> Result<String>;
}
