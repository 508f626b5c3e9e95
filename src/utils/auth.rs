//! Authentication header helpers for backend requests.

/// Attach `Authorization: Bearer <secret>`.
///
/// Every backend call uses bearer auth; which secret is passed depends on
/// the call (master secret for probe and issuance, API secret for
/// completions).
pub fn add_bearer_auth(request: reqwest::RequestBuilder, secret: &str) -> reqwest::RequestBuilder {
    request.header(reqwest::header::AUTHORIZATION, format!("Bearer {secret}"))
}
