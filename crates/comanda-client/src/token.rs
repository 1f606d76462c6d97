//! Token utilities.

use comanda_common::access_token::AccessTokenClaims;

use crate::Error;

/// An access token, both in encoded and decoded format.
///
/// The signature is not verified: the client only reads the subject and the expiry, and
/// leaves verification to the backend.
#[derive(Clone, Debug)]
pub struct AccessToken {
    /// The access token in JWT format
    pub token: String,

    /// The decoded token claims
    pub claims: AccessTokenClaims,
}

impl AccessToken {
    /// Decode the claims of a JWT access token.
    pub fn decode(token: impl Into<String>) -> Result<Self, Error> {
        let token = token.into();

        let mut validation = jsonwebtoken::Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = jsonwebtoken::decode::<AccessTokenClaims>(
            &token,
            &jsonwebtoken::DecodingKey::from_secret(&[]),
            &validation,
        )
        .map_err(|err| Error::InvalidAccessToken(err.into()))?;

        Ok(Self {
            token,
            claims: token_data.claims,
        })
    }

    /// Whether the token has expired at the given unix time.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.claims.is_expired_at(now)
    }
}

/// The current unix time in seconds.
pub(crate) fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
