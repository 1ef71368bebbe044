//! The token wire format (spec.md §6): `v1.<base64url(payload)>.<base64url(signature)>`,
//! where the signature covers the literal bytes `v1.<payload>` (the version
//! tag and the base64url-encoded payload, joined by the dot - not the
//! decoded payload bytes alone).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use warden_crypto::{TokenSigningKey, TokenVerifyingKey};

use crate::claims::Claims;
use crate::error::ValidateError;

const VERSION_TAG: &str = "v1";

/// Serialize, sign, and frame `claims` into a bearer token string.
pub fn encode(claims: &Claims, signing_key: &TokenSigningKey) -> String {
    let payload_json = serde_json::to_vec(claims).expect("Claims always serializes");
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
    let signing_input = format!("{VERSION_TAG}.{payload_b64}");
    let signature = signing_key.sign(signing_input.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(signature);
    format!("{signing_input}.{signature_b64}")
}

/// Parse and verify a bearer token string, returning its claims if the
/// signature checks out under `verifying_key`. Does not check expiry,
/// revocation, or scope; callers layer those on (spec.md §4.7).
pub fn decode_and_verify(token: &str, verifying_key: &TokenVerifyingKey) -> Result<Claims, ValidateError> {
    let mut parts = token.splitn(3, '.');
    let version = parts.next().ok_or(ValidateError::Malformed)?;
    let payload_b64 = parts.next().ok_or(ValidateError::Malformed)?;
    let signature_b64 = parts.next().ok_or(ValidateError::Malformed)?;
    if parts.next().is_some() {
        return Err(ValidateError::Malformed);
    }
    if version != VERSION_TAG {
        return Err(ValidateError::Malformed);
    }

    let signature_bytes = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|_| ValidateError::Malformed)?;
    let signature: [u8; 64] = signature_bytes.try_into().map_err(|_| ValidateError::Malformed)?;

    let signing_input = format!("{version}.{payload_b64}");
    verifying_key.verify(signing_input.as_bytes(), &signature).map_err(|_| ValidateError::BadSignature)?;

    let payload_json = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| ValidateError::Malformed)?;
    serde_json::from_slice(&payload_json).map_err(|_| ValidateError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{KeySelector, TokenScope, WildcardMarker};
    use chrono::{Duration, Utc};
    use warden_types::{Action, Principal, ProjectName, TokenId};

    fn sample_claims() -> Claims {
        let now = Utc::now();
        Claims {
            tid: TokenId::generate(),
            sub: Principal::new("svc-a"),
            scp: TokenScope { prj: ProjectName::parse("svcA").unwrap(), keys: KeySelector::Wildcard(WildcardMarker), act: vec![Action::Read] },
            iat: now,
            nbf: None,
            exp: now + Duration::hours(1),
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let key = TokenSigningKey::generate();
        let claims = sample_claims();
        let token = encode(&claims, &key);
        assert!(token.starts_with("v1."));
        let decoded = decode_and_verify(&token, &key.verifying_key()).unwrap();
        assert_eq!(decoded.tid, claims.tid);
    }

    #[test]
    fn tampered_token_fails_verification() {
        let key = TokenSigningKey::generate();
        let mut token = encode(&sample_claims(), &key);
        token.push('x');
        assert!(decode_and_verify(&token, &key.verifying_key()).is_err());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let key = TokenSigningKey::generate();
        let other = TokenSigningKey::generate();
        let token = encode(&sample_claims(), &key);
        assert!(matches!(decode_and_verify(&token, &other.verifying_key()), Err(ValidateError::BadSignature)));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let key = TokenSigningKey::generate();
        assert!(matches!(decode_and_verify("not-a-token", &key.verifying_key()), Err(ValidateError::Malformed)));
    }
}
