/// Axum extractor for a Bearer token in the Authorization header per [RFC 6750][]
///
/// [RFC 6750]: https://datatracker.ietf.org/doc/html/rfc6750#section-2.1
#[derive(Debug)]
pub(crate) struct ExtractBearer(pub(crate) secrecy::SecretString);

impl<S> axum::extract::FromRequestParts<S> for ExtractBearer
where
    S: Send + Sync,
{
    type Rejection = ExtractBearerRejection;

    #[tracing::instrument(skip_all)]
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        use headers::Header;

        let mut values = parts
            .headers
            .get_all(headers::Authorization::<headers::authorization::Bearer>::name())
            .iter();
        match values.size_hint() {
            (0, Some(0)) => Err(ExtractBearerRejection::Missing),
            (1, Some(1)) => {
                headers::Authorization::<headers::authorization::Bearer>::decode(&mut values)
                    .map(|h| ExtractBearer(secrecy::SecretString::new(h.token().into())))
                    .map_err(ExtractBearerRejection::Error)
            }
            _ => Err(ExtractBearerRejection::Ambiguous),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ExtractBearerRejection {
    #[error("bearer token was missing, must be given through Authorization header")]
    Missing,
    /// multiple Authorization headers were given
    #[error("multiple bearer tokens were given")]
    Ambiguous,
    #[error(transparent)]
    Error(headers::Error),
}

impl axum::response::IntoResponse for ExtractBearerRejection {
    fn into_response(self) -> axum::response::Response {
        (axum::http::StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Compares two secrets in constant time.
pub(crate) fn token_matches(expected: &secrecy::SecretString, given: &secrecy::SecretString) -> bool {
    use secrecy::ExposeSecret;
    use subtle::ConstantTimeEq;

    expected
        .expose_secret()
        .as_bytes()
        .ct_eq(given.expose_secret().as_bytes())
        .unwrap_u8()
        == 1
}
