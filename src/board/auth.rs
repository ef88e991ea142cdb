//! JWT access/refresh tokens, the refresh cookie, and the bearer-token
//! middleware guarding the protected routes.
//!
//! Access and refresh tokens are signed with separate HS256 secrets so one
//! can never stand in for the other. The access token travels in the
//! `Authorization` header; the refresh token only ever lives in an
//! http-only cookie.

use anyhow::{Context, Result, anyhow};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::{Error as JwtError, ErrorKind},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::api::{ApiError, SharedState};
use crate::config::AuthSection;
use crate::errors::TrackerError;

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// RACFID of the signed-in user.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Random per-token id; keeps two tokens minted in the same second distinct.
    pub jti: String,
}

impl Claims {
    fn new(racfid: &str, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: racfid.to_string(),
            iat: now,
            exp: now + ttl_secs,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// One signing secret and the lifetime of tokens minted with it.
struct Signer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl Signer {
    fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    fn sign(&self, racfid: &str) -> Result<String> {
        encode(
            &Header::new(Algorithm::HS256),
            &Claims::new(racfid, self.ttl_secs),
            &self.encoding,
        )
        .context("Failed to sign token")
    }

    fn verify(&self, token: &str) -> Result<Claims, TrackerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(classify)
    }
}

/// Expired tokens and bad tokens get different status codes; a broken key
/// is a server fault.
fn classify(err: JwtError) -> TrackerError {
    match err.kind() {
        ErrorKind::ExpiredSignature => TrackerError::TokenExpired,
        ErrorKind::InvalidKeyFormat => {
            TrackerError::Other(anyhow!("Signing key unusable: {}", err))
        }
        _ => TrackerError::TokenInvalid,
    }
}

/// Issues and verifies the token pair and builds the refresh cookie.
pub struct TokenService {
    access: Signer,
    refresh: Signer,
    cookie_name: String,
    cookie_secure: bool,
}

impl TokenService {
    /// Build from config. Both secrets must be present.
    pub fn new(auth: &AuthSection) -> Result<Self> {
        let access = auth
            .access_token_secret
            .as_deref()
            .context("auth.access_token_secret is not set")?;
        let refresh = auth
            .refresh_token_secret
            .as_deref()
            .context("auth.refresh_token_secret is not set")?;
        Ok(Self {
            access: Signer::new(access.as_bytes(), auth.access_token_ttl_secs),
            refresh: Signer::new(refresh.as_bytes(), auth.refresh_token_ttl_secs),
            cookie_name: auth.cookie_name.clone(),
            cookie_secure: auth.cookie_secure,
        })
    }

    pub fn issue_pair(&self, racfid: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.access.sign(racfid)?,
            refresh: self.refresh.sign(racfid)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TrackerError> {
        self.access.verify(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TrackerError> {
        self.refresh.verify(token)
    }

    /// `Set-Cookie` value carrying a refresh token.
    pub fn refresh_cookie(&self, token: &str) -> String {
        Cookie::build((self.cookie_name.clone(), token.to_string()))
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(CookieDuration::seconds(self.refresh.ttl_secs))
            .build()
            .to_string()
    }

    /// `Set-Cookie` value that makes the browser drop the refresh cookie.
    pub fn clear_cookie(&self) -> String {
        let mut cookie = Cookie::build((self.cookie_name.clone(), ""))
            .http_only(true)
            .secure(self.cookie_secure)
            .same_site(SameSite::Strict)
            .path("/")
            .build();
        cookie.make_removal();
        cookie.to_string()
    }

    /// Find the refresh token among the request's cookies.
    pub fn refresh_token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(|c| c.ok())
            .find(|c| c.name() == self.cookie_name && !c.value().is_empty())
            .map(|c| c.value().to_string())
    }
}

/// The authenticated caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub racfid: String,
}

/// Bearer-token middleware for the protected routes.
pub async fn require_auth(
    State(state): State<SharedState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;

    let claims = state.tokens.verify_access(token)?;
    tracing::debug!(racfid = %claims.sub, "Authenticated request");
    req.extensions_mut().insert(AuthUser { racfid: claims.sub });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth_section() -> AuthSection {
        AuthSection {
            access_token_secret: Some("access-secret".into()),
            refresh_token_secret: Some("refresh-secret".into()),
            ..AuthSection::default()
        }
    }

    fn service() -> TokenService {
        TokenService::new(&auth_section()).unwrap()
    }

    #[test]
    fn test_new_requires_both_secrets() {
        let mut auth = auth_section();
        auth.refresh_token_secret = None;
        let err = TokenService::new(&auth).err().expect("should fail");
        assert!(err.to_string().contains("refresh_token_secret"));
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let tokens = service();
        let pair = tokens.issue_pair("J000001").unwrap();

        let access = tokens.verify_access(&pair.access).unwrap();
        assert_eq!(access.sub, "J000001");
        assert_eq!(access.exp - access.iat, 900);

        let refresh = tokens.verify_refresh(&pair.refresh).unwrap();
        assert_eq!(refresh.sub, "J000001");
        assert_eq!(refresh.exp - refresh.iat, 604_800);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens.issue_pair("J000001").unwrap();
        assert!(matches!(
            tokens.verify_access(&pair.refresh),
            Err(TrackerError::TokenInvalid)
        ));
        assert!(matches!(
            tokens.verify_refresh(&pair.access),
            Err(TrackerError::TokenInvalid)
        ));
    }

    #[test]
    fn test_two_pairs_in_same_second_differ() {
        let tokens = service();
        let a = tokens.issue_pair("J000001").unwrap();
        let b = tokens.issue_pair("J000001").unwrap();
        assert_ne!(a.access, b.access);
        assert_ne!(a.refresh, b.refresh);
    }

    #[test]
    fn test_expired_token_is_classified_as_expired() {
        let mut auth = auth_section();
        auth.access_token_ttl_secs = -60;
        let tokens = TokenService::new(&auth).unwrap();
        let pair = tokens.issue_pair("J000001").unwrap();
        assert!(matches!(
            tokens.verify_access(&pair.access),
            Err(TrackerError::TokenExpired)
        ));
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let tokens = service();
        assert!(matches!(
            tokens.verify_access("not.a.jwt"),
            Err(TrackerError::TokenInvalid)
        ));
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = service().refresh_cookie("tok");
        assert!(cookie.starts_with("jwt=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = service().clear_cookie();
        assert!(cookie.starts_with("jwt="));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_refresh_token_from_headers() {
        let tokens = service();
        let mut headers = HeaderMap::new();
        assert_eq!(tokens.refresh_token_from_headers(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; jwt=abc.def.ghi; other=1"),
        );
        assert_eq!(
            tokens.refresh_token_from_headers(&headers).as_deref(),
            Some("abc.def.ghi")
        );

        headers.insert(header::COOKIE, HeaderValue::from_static("jwt="));
        assert_eq!(tokens.refresh_token_from_headers(&headers), None);
    }
}
