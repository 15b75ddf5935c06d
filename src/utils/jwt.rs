//! Utilidades JWT
//!
//! Los tokens los emite el servicio de identidad; aquí solo se verifican.
//! `generate_token` existe para herramientas locales y tests.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    config::environment::EnvironmentConfig,
    models::auth::{JwtClaims, UserRole},
    utils::errors::AppError,
};

/// Configuración de JWT
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
}

impl From<&EnvironmentConfig> for JwtConfig {
    fn from(config: &EnvironmentConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            issuer: config.jwt_issuer.clone(),
        }
    }
}

/// Generar JWT token para un usuario
pub fn generate_token(
    user_id: &str,
    name: Option<&str>,
    role: UserRole,
    expires_in_secs: i64,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::seconds(expires_in_secs);

    let claims = JwtClaims {
        sub: user_id.to_string(),
        name: name.map(str::to_string),
        role: role.as_str().to_string(),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
        iss: config.issuer.clone(),
    };

    let encoding_key = EncodingKey::from_secret(config.secret.as_ref());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AppError::Jwt(format!("Error generando token: {}", e)))
}

/// Verificar y decodificar JWT token
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<JwtClaims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

    let mut validation = Validation::default();
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }

    let token_data = decode::<JwtClaims>(token, &decoding_key, &validation)
        .map_err(|e| AppError::Jwt(format!("Token inválido: {}", e)))?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(AppError::Jwt("Token sin sujeto".to_string()));
    }

    Ok(token_data.claims)
}

/// Extraer token del header Authorization
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AppError> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Header Authorization debe comenzar con 'Bearer '".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AppError::Unauthorized("Token no puede estar vacío".to_string()));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            issuer: None,
        }
    }

    #[test]
    fn test_token_roundtrip_keeps_role_and_name() {
        let token = generate_token("42", Some("Marko"), UserRole::Admin, 600, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.name.as_deref(), Some("Marko"));
        assert_eq!(UserRole::from_claim(&claims.role), UserRole::Admin);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = generate_token("42", None, UserRole::User, -3600, &config()).unwrap();
        assert!(verify_token(&token, &config()).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = generate_token("42", None, UserRole::User, 600, &config()).unwrap();
        let other = JwtConfig {
            secret: "other".to_string(),
            issuer: None,
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        assert_eq!(extract_token_from_header("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
    }
}
