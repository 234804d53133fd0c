//! VAPID authorization (RFC 8292)
//!
//! The key pair is validated once at startup and shared read-only. Every
//! delivery gets a fresh ES256 token scoped to the push service origin.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use p256::{
    elliptic_curve::sec1::ToEncodedPoint, pkcs8::EncodePrivateKey, SecretKey,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Uncompressed SEC1 point: 0x04 || x || y.
pub const PUBLIC_KEY_LENGTH: usize = 65;
pub const PRIVATE_KEY_LENGTH: usize = 32;
pub const TOKEN_LIFETIME_HOURS: i64 = 12;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String,
    pub sub: String,
    pub exp: i64,
}

pub struct VapidKeyPair {
    subject: String,
    public_key: String,
    encoding_key: EncodingKey,
}

impl fmt::Debug for VapidKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidKeyPair")
            .field("subject", &self.subject)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl VapidKeyPair {
    /// Validates subject and key material. Both keys are base64url without
    /// padding; the public key must be the one derived from the private key.
    pub fn new(
        subject: &str,
        public_key: &str,
        private_key: &str,
    ) -> Result<VapidKeyPair, Error> {
        validate_subject(subject)?;

        let public_bytes =
            decode_key("public", public_key.trim(), PUBLIC_KEY_LENGTH)?;
        if public_bytes[0] != 0x04 {
            return Err(Error::ConfigurationError(String::from(
                "VAPID public key must be an uncompressed P-256 point",
            )));
        }

        let private_bytes =
            decode_key("private", private_key.trim(), PRIVATE_KEY_LENGTH)?;
        let secret = SecretKey::from_slice(&private_bytes).map_err(|_| {
            Error::ConfigurationError(String::from(
                "VAPID private key is not a valid P-256 scalar",
            ))
        })?;

        let derived = secret.public_key().to_encoded_point(false);
        if derived.as_bytes() != public_bytes.as_slice() {
            return Err(Error::ConfigurationError(String::from(
                "VAPID public key does not match the private key",
            )));
        }

        let der = secret.to_pkcs8_der().map_err(|e| {
            Error::ConfigurationError(format!(
                "VAPID private key encoding failed: {}",
                e
            ))
        })?;

        Ok(VapidKeyPair {
            subject: subject.to_owned(),
            public_key: public_key.trim().to_owned(),
            encoding_key: EncodingKey::from_ec_der(der.as_bytes()),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Base64url public key, the browser's `applicationServerKey`.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

/// Builds the `Authorization` header value for one endpoint.
pub fn authorize(
    endpoint: &str,
    keys: &VapidKeyPair,
    now: DateTime<Utc>,
) -> Result<String, Error> {
    let claims = claims(endpoint, keys.subject(), now)?;
    let token =
        encode(&Header::new(Algorithm::ES256), &claims, &keys.encoding_key)?;

    Ok(format!("vapid t={}, k={}", token, keys.public_key()))
}

pub fn claims(
    endpoint: &str,
    subject: &str,
    now: DateTime<Utc>,
) -> Result<Claims, Error> {
    let url = Url::parse(endpoint)?;
    let host = match url.host_str() {
        Some(host) => host,
        None => {
            return Err(Error::InvalidOption {
                option: String::from("host"),
            });
        },
    };

    Ok(Claims {
        aud: format!("{}://{}", url.scheme(), host),
        sub: subject.to_owned(),
        exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
    })
}

/// Accepts `mailto:` with a plausible address, or an `https:` contact URL.
pub fn validate_subject(subject: &str) -> Result<(), Error> {
    let valid = if let Some(address) = subject.strip_prefix("mailto:") {
        is_email(address)
    } else if subject.starts_with("https://") {
        Url::parse(subject).is_ok_and(|url| url.host_str().is_some())
    } else {
        false
    };

    if !valid {
        return Err(Error::ConfigurationError(format!(
            "VAPID subject must be mailto:<email> or an https URL, got {:?}",
            subject
        )));
    }

    Ok(())
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));

    let Some((name, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    let name_ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    local_ok && name_ok && tld_ok
}

fn decode_key(
    kind: &str,
    value: &str,
    length: usize,
) -> Result<Vec<u8>, Error> {
    let bytes = BASE64_URL.decode(value).map_err(|e| {
        Error::ConfigurationError(format!(
            "VAPID {} key is not base64url without padding: {}",
            kind, e
        ))
    })?;

    if bytes.len() != length {
        return Err(Error::ConfigurationError(format!(
            "VAPID {} key must be {} bytes, got {}",
            kind,
            length,
            bytes.len()
        )));
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};

    const SUBJECT: &str = "mailto:admin@example.com";

    fn keys() -> (String, String) {
        let secret = SecretKey::from_slice(&[0x11; 32]).unwrap();
        let public = secret.public_key().to_encoded_point(false);
        (
            BASE64_URL.encode(public.as_bytes()),
            BASE64_URL.encode([0x11; 32]),
        )
    }

    fn key_pair() -> VapidKeyPair {
        let (public, private) = keys();
        VapidKeyPair::new(SUBJECT, &public, &private).unwrap()
    }

    fn token(header: &str) -> &str {
        header
            .strip_prefix("vapid t=")
            .and_then(|rest| rest.split(", k=").next())
            .unwrap()
    }

    #[test]
    fn accepts_valid_configuration() {
        let (public, _) = keys();
        let pair = key_pair();
        assert_eq!(public.len(), 87);
        assert_eq!(pair.public_key(), public);
        assert_eq!(pair.subject(), SUBJECT);
    }

    #[test]
    fn rejects_subject_that_is_not_a_contact() {
        let (public, private) = keys();
        let result = VapidKeyPair::new("not-an-email", &public, &private);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        assert!(validate_subject("mailto:nobody").is_err());
        assert!(validate_subject("mailto:a@b.c").is_err());
        assert!(validate_subject("http://example.com").is_err());
        assert!(validate_subject("https://example.com/contact").is_ok());
        assert!(validate_subject("mailto:ops+push@mail.example.org").is_ok());
    }

    #[test]
    fn rejects_wrong_key_lengths() {
        let (public, private) = keys();
        assert!(VapidKeyPair::new(SUBJECT, &public[..86], &private).is_err());
        assert!(VapidKeyPair::new(SUBJECT, &public, &private[..42]).is_err());
        let padded = format!("{}=", private);
        assert!(VapidKeyPair::new(SUBJECT, &public, &padded).is_err());
    }

    #[test]
    fn rejects_mismatched_public_key() {
        let (_, private) = keys();
        let other = SecretKey::from_slice(&[0x22; 32]).unwrap();
        let other_public =
            BASE64_URL.encode(other.public_key().to_encoded_point(false).as_bytes());
        let result = VapidKeyPair::new(SUBJECT, &other_public, &private);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn rejects_zero_scalar() {
        let (public, _) = keys();
        let zero = BASE64_URL.encode([0u8; 32]);
        assert!(VapidKeyPair::new(SUBJECT, &public, &zero).is_err());
    }

    #[test]
    fn header_and_claims_segments_are_fixed() {
        let pair = key_pair();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let header = authorize(
            "https://fcm.googleapis.com/fcm/send/abc123",
            &pair,
            now,
        )
        .unwrap();

        let segments: Vec<&str> = token(&header).split('.').collect();
        assert_eq!(segments.len(), 3);

        let jwt_header = BASE64_URL.decode(segments[0]).unwrap();
        assert_eq!(
            String::from_utf8(jwt_header).unwrap(),
            r#"{"typ":"JWT","alg":"ES256"}"#
        );

        let expected_exp = now.timestamp() + 12 * 3600;
        let jwt_claims = BASE64_URL.decode(segments[1]).unwrap();
        assert_eq!(
            String::from_utf8(jwt_claims).unwrap(),
            format!(
                r#"{{"aud":"https://fcm.googleapis.com","sub":"{}","exp":{}}}"#,
                SUBJECT, expected_exp
            )
        );

        assert!(header.ends_with(&format!(", k={}", pair.public_key())));
    }

    #[test]
    fn repeated_calls_share_header_and_claims() {
        let pair = key_pair();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
        let endpoint = "https://updates.push.services.mozilla.com/wpush/v2/x";

        let first = authorize(endpoint, &pair, now).unwrap();
        let second = authorize(endpoint, &pair, now).unwrap();

        let first: Vec<&str> = token(&first).split('.').collect();
        let second: Vec<&str> = token(&second).split('.').collect();
        assert_eq!(first[..2], second[..2]);
    }

    #[test]
    fn signature_verifies_with_public_key() {
        let pair = key_pair();
        let header =
            authorize("https://push.example.net/endpoint", &pair, Utc::now())
                .unwrap();
        let token = token(&header);
        let (signed, signature) = token.rsplit_once('.').unwrap();

        let public = BASE64_URL.decode(pair.public_key()).unwrap();
        let verifying_key = VerifyingKey::from_sec1_bytes(&public).unwrap();
        let signature =
            Signature::from_slice(&BASE64_URL.decode(signature).unwrap())
                .unwrap();

        assert!(verifying_key.verify(signed.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn audience_drops_path_and_query() {
        let claims = claims(
            "https://web.push.apple.com:443/QGx?token=1",
            SUBJECT,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(claims.aud, "https://web.push.apple.com");

        assert!(claims_for_hostless().is_err());
    }

    fn claims_for_hostless() -> Result<Claims, Error> {
        claims("mailto:someone@example.com", SUBJECT, Utc::now())
    }
}
