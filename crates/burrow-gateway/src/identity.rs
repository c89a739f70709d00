//! Anonymous per-browser identity.
//!
//! Every request gets an owner id. It is read from a signed token in the
//! `user_id` cookie or an `Authorization: Bearer` header; when neither holds
//! a valid token a fresh UUID is issued and returned as a cookie.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const COOKIE_NAME: &str = "user_id";

const TOKEN_TTL: SignedDuration = SignedDuration::from_hours(24);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies identity tokens (HS256).
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a token for `owner_id`, valid for 24 hours.
    pub fn issue(&self, owner_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Timestamp::now();
        let claims = Claims {
            sub: owner_id.to_string(),
            iat: now.as_second(),
            exp: (now + TOKEN_TTL).as_second(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Returns the owner id carried by a valid token.
    pub fn verify(&self, token: &str) -> Option<String> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => Some(data.claims.sub),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(error = %err, "rejected identity token");
                None
            }
        }
    }
}

/// The caller's owner id, attached to every request by [`identify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner_id: String,
    /// `true` when the request carried no valid token and the id was minted
    /// for this response.
    pub issued: bool,
}

impl Identity {
    /// Owner id of a caller that proved an existing identity.
    pub fn known_owner(&self) -> Result<&str, AppError> {
        if self.issued {
            return Err(AppError::Unauthorized);
        }
        Ok(&self.owner_id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// Middleware resolving the caller's [`Identity`].
pub async fn identify(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let signer = state.signer();
    let known = jar
        .get(COOKIE_NAME)
        .and_then(|cookie| signer.verify(cookie.value()))
        .or_else(|| bearer_token(request.headers()).and_then(|token| signer.verify(token)));

    if let Some(owner_id) = known {
        request.extensions_mut().insert(Identity {
            owner_id,
            issued: false,
        });
        return next.run(request).await;
    }

    let owner_id = uuid::Uuid::new_v4().to_string();
    let token = match signer.issue(&owner_id) {
        Ok(token) => Some(token),
        Err(err) => {
            tracing::error!(error = %err, "failed to sign identity token");
            None
        }
    };
    tracing::debug!(%owner_id, "issued new identity");

    request.extensions_mut().insert(Identity {
        owner_id,
        issued: true,
    });
    let response = next.run(request).await;

    match token {
        Some(token) => {
            let cookie = Cookie::build((COOKIE_NAME, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), response).into_response()
        }
        None => response,
    }
}
