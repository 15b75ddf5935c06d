//! Autenticación JWT
//!
//! `AuthenticatedUser` se obtiene como extractor: cualquier handler que lo
//! reciba exige un bearer token válido. El token original se conserva para
//! reenviarlo a los servicios externos.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    models::auth::AuthenticatedUser,
    utils::{
        errors::AppError,
        jwt::{extract_token_from_header, verify_token, JwtConfig},
    },
};

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    JwtConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Token de autorización requerido".to_string()))?;

        let token = extract_token_from_header(auth_header)?;
        let config = JwtConfig::from_ref(state);
        let claims = verify_token(token, &config)?;

        let user = AuthenticatedUser::from_claims(claims, Some(token.to_string()));
        log::debug!("🔑 Authenticated user {} ({})", user.user_id, user.role.as_str());
        Ok(user)
    }
}
