use crate::models::{Identity, Role};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by the session token the auth service issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: String,
    pub role: Role,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(user_id: &str, role: Role, ttl_secs: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
            exp: chrono::Utc::now().timestamp() + ttl_secs,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            role: self.role,
        }
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256, String> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|err| {
        tracing::error!("error generating hmac {err:?}");
        "invalid session secret".to_string()
    })
}

/// Encode an HS256 token: `base64url(header).base64url(claims).base64url(signature)`
pub fn encode_session_token(claims: &SessionClaims, secret: &str) -> Result<String, String> {
    let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let payload = serde_json::to_string(claims).map_err(|e| e.to_string())?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

    let signing_input = format!("{header_b64}.{payload_b64}");
    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

/// Verify signature and expiration, then return the claims
pub fn decode_session_token(token: &str, secret: &str) -> Result<SessionClaims, String> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
        return Err("Invalid token format: expected 3 parts (header.payload.signature)".to_string());
    };

    let header = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|e| format!("Failed to decode token header: {}", e))?;
    let header: serde_json::Value = serde_json::from_slice(&header)
        .map_err(|e| format!("Failed to parse token header: {}", e))?;
    if header.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
        return Err("Unsupported token algorithm".to_string());
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| format!("Failed to decode token signature: {}", e))?;
    let mut mac = mac_for(secret)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| "Invalid token signature".to_string())?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| format!("Failed to decode token payload: {}", e))?;
    let claims: SessionClaims = serde_json::from_slice(&payload)
        .map_err(|e| format!("Failed to parse token claims: {}", e))?;

    let now = chrono::Utc::now().timestamp();
    if claims.exp < now {
        return Err(format!(
            "Session token expired (exp: {}, now: {})",
            claims.exp, now
        ));
    }

    Ok(claims)
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(authorization: &str) -> Option<&str> {
    let mut parts = authorization.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

/// Find `name=value` in a Cookie header
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == name && !value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn token_round_trips_identity() {
        let claims = SessionClaims::new("client-ana", Role::Client, 3600);
        let token = encode_session_token(&claims, SECRET).unwrap();

        let decoded = decode_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded.identity().user_id, "client-ana");
        assert_eq!(decoded.identity().role, Role::Client);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            encode_session_token(&SessionClaims::new("u", Role::Lawyer, 60), SECRET).unwrap();
        let err = decode_session_token(&token, "another-secret").unwrap_err();
        assert!(err.contains("signature"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token =
            encode_session_token(&SessionClaims::new("client-ana", Role::Client, 60), SECRET)
                .unwrap();
        let forged_claims = SessionClaims::new("client-ana", Role::Lawyer, 60);
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_string(&forged_claims).unwrap());

        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(decode_session_token(&forged, SECRET).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = SessionClaims::new("u", Role::Client, -10);
        let token = encode_session_token(&claims, SECRET).unwrap();
        let err = decode_session_token(&token, SECRET).unwrap_err();
        assert!(err.contains("expired"));
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(decode_session_token("not-a-token", SECRET).is_err());
        assert!(decode_session_token("a.b", SECRET).is_err());
    }

    #[test]
    fn bearer_and_cookie_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer"), None);

        let header = "theme=dark; token=abc.def.ghi; other=1";
        assert_eq!(cookie_value(header, "token"), Some("abc.def.ghi"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("token=", "token"), None);
    }
}
