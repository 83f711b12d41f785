//! HS256 token signing and stateless validation.

use crate::config::{ConfigError, JwtSettings};
use crate::error::TokenError;
use crate::token::Claim;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};

/// Registered claim names written by the signer itself.
const EXP: &str = "exp";
const ISS: &str = "iss";
const AUD: &str = "aud";

/// A freshly signed token.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// The contents of a token that passed validation.
#[derive(Clone, Debug)]
pub struct ValidatedToken {
    /// Identity claims in the order they were signed.
    pub claims: Vec<Claim>,
    pub issuer: String,
    pub audience: String,
    pub expires_at: OffsetDateTime,
}

/// Signs and validates bearer tokens with a single symmetric key.
///
/// Built once at startup from [`JwtSettings`]; bad settings are rejected here rather than
/// on the first request. The issuer doubles as the audience.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(settings: &JwtSettings) -> Result<Self, ConfigError> {
        if settings.key.is_empty() {
            return Err(ConfigError::Validation("jwt.key must be set".into()));
        }
        if settings.issuer.trim().is_empty() {
            return Err(ConfigError::Validation("jwt.issuer must be set".into()));
        }
        let lifetime = settings.lifetime()?;
        let secret = settings.key.as_bytes();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: settings.issuer.clone(),
            lifetime,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign `claims` into a token expiring `lifetime` from now.
    ///
    /// "Now" is the wall clock, so clock adjustments shift expiry accordingly.
    pub fn issue(&self, claims: &[Claim]) -> Result<IssuedToken, TokenError> {
        self.issue_at(claims, OffsetDateTime::now_utc())
    }

    /// Sign `claims` as if issued at `issued_at`.
    pub fn issue_at(
        &self,
        claims: &[Claim],
        issued_at: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at
            .checked_add(self.lifetime)
            .ok_or(TokenError::ExpiryOutOfRange)?;

        let mut payload = Map::with_capacity(claims.len() + 3);
        for claim in claims {
            payload.insert(claim.name.clone(), Value::String(claim.value.clone()));
        }
        payload.insert(EXP.into(), Value::from(expires_at.unix_timestamp()));
        payload.insert(ISS.into(), Value::String(self.issuer.clone()));
        payload.insert(AUD.into(), Value::String(self.issuer.clone()));

        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &self.encoding_key,
        )
        .map_err(TokenError::Encode)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature, expiry, issuer and audience, and recover the identity claims.
    ///
    /// No leeway is applied to `exp`.
    pub fn validate(&self, token: &str) -> Result<ValidatedToken, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.issuer]);
        validation.set_required_spec_claims(&[EXP, ISS, AUD]);

        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &validation)
            .map_err(TokenError::from_validation)?;
        let mut payload = data.claims;

        let exp = payload
            .shift_remove(EXP)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| TokenError::MalformedPayload("exp is not an integer".into()))?;
        let expires_at = OffsetDateTime::from_unix_timestamp(exp)
            .map_err(|e| TokenError::MalformedPayload(format!("exp out of range: {e}")))?;
        let issuer = payload.shift_remove(ISS).map(claim_value).unwrap_or_default();
        let audience = payload.shift_remove(AUD).map(claim_value).unwrap_or_default();

        let claims = payload
            .into_iter()
            .map(|(name, value)| Claim {
                name,
                value: claim_value(value),
            })
            .collect();

        Ok(ValidatedToken {
            claims,
            issuer,
            audience,
            expires_at,
        })
    }
}

fn claim_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::claims::{self, build_claims};
    use crate::identity::IdentitySummary;
    use time::PrimitiveDateTime;

    const ISSUER: &str = "https://accounts.example.org";

    fn settings(key: &str) -> JwtSettings {
        JwtSettings {
            key: key.into(),
            issuer: ISSUER.into(),
            expire_days: "7".into(),
        }
    }

    fn service() -> TokenService {
        TokenService::new(&settings("an-hmac-key-that-is-long-enough-for-hs256")).unwrap()
    }

    fn sample_claims() -> Vec<Claim> {
        build_claims(&IdentitySummary {
            id: "user-1".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "grace@example.org".into(),
            user_name: "grace@example.org".into(),
            role: "Admin".into(),
        })
    }

    #[test]
    fn issued_token_validates_and_round_trips_claims() {
        let svc = service();
        let claims = sample_claims();
        let issued = svc.issue(&claims).unwrap();
        assert!(!issued.token.is_empty());

        let validated = svc.validate(&issued.token).unwrap();
        assert_eq!(validated.claims, claims);
        assert_eq!(validated.issuer, ISSUER);
        assert_eq!(validated.audience, ISSUER);
        assert_eq!(
            validated.expires_at.unix_timestamp(),
            issued.expires_at.unix_timestamp()
        );
    }

    #[test]
    fn expiry_is_issuance_plus_configured_days() {
        let svc = service();
        let issued_at = OffsetDateTime::now_utc();
        let issued = svc.issue_at(&sample_claims(), issued_at).unwrap();
        assert_eq!(issued.expires_at - issued_at, Duration::days(7));
    }

    #[test]
    fn fractional_days_are_honoured() {
        let svc = TokenService::new(&JwtSettings {
            expire_days: "0.5".into(),
            ..settings("key")
        })
        .unwrap();
        assert_eq!(svc.lifetime(), Duration::hours(12));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let issued_at = OffsetDateTime::now_utc() - Duration::days(8);
        let issued = svc.issue_at(&sample_claims(), issued_at).unwrap();
        assert!(matches!(
            svc.validate(&issued.token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let issued = service().issue(&sample_claims()).unwrap();
        let other = TokenService::new(&settings("a-completely-different-signing-key")).unwrap();
        assert!(matches!(
            other.validate(&issued.token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn token_from_another_issuer_is_rejected() {
        let issued = service().issue(&sample_claims()).unwrap();
        let other = TokenService::new(&JwtSettings {
            issuer: "https://elsewhere.example.org".into(),
            ..settings("an-hmac-key-that-is-long-enough-for-hs256")
        })
        .unwrap();
        assert!(matches!(
            other.validate(&issued.token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let issued = svc.issue(&sample_claims()).unwrap();
        let forged = svc.issue(&[Claim::new(claims::ROLE, "Root")]).unwrap();
        let forged_payload = forged.token.split('.').nth(1).unwrap().to_string();
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        parts[1] = &forged_payload;
        assert!(svc.validate(&parts.join(".")).is_err());
    }

    #[test]
    fn lifetime_past_the_calendar_fails_at_construction() {
        for days in ["3000000", "1e300"] {
            let bad = JwtSettings {
                expire_days: days.into(),
                ..settings("key")
            };
            assert!(
                matches!(TokenService::new(&bad), Err(ConfigError::Validation(_))),
                "expire_days {days} accepted"
            );
        }
    }

    #[test]
    fn sub_second_lifetime_fails_at_construction() {
        let bad = JwtSettings {
            expire_days: "1e-12".into(),
            ..settings("key")
        };
        assert!(TokenService::new(&bad).is_err());
    }

    #[test]
    fn issuing_near_the_end_of_time_is_an_error() {
        let issued_at = PrimitiveDateTime::MAX.assume_utc() - Duration::days(1);
        assert!(matches!(
            service().issue_at(&sample_claims(), issued_at),
            Err(TokenError::ExpiryOutOfRange)
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(service().validate("not.a.jwt").is_err());
        assert!(service().validate("").is_err());
    }

    #[test]
    fn empty_key_fails_at_construction() {
        assert!(matches!(
            TokenService::new(&settings("")),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn empty_issuer_fails_at_construction() {
        let bad = JwtSettings {
            issuer: String::new(),
            ..settings("key")
        };
        assert!(TokenService::new(&bad).is_err());
    }

    #[test]
    fn unparsable_lifetime_fails_at_construction() {
        let bad = JwtSettings {
            expire_days: "a week".into(),
            ..settings("key")
        };
        assert!(TokenService::new(&bad).is_err());
    }
}
