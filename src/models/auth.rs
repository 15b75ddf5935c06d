use serde::{Deserialize, Serialize};

/// Roles emitidos por el servicio de identidad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::User => "User",
        }
    }

    /// Cualquier rol desconocido se trata como usuario normal
    pub fn from_claim(s: &str) -> Self {
        if s.eq_ignore_ascii_case("admin") {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }
}

/// Claims del JWT emitido por el servicio de identidad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

fn default_role() -> String {
    UserRole::User.as_str().to_string()
}

/// Usuario autenticado que origina una operación
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub name: Option<String>,
    pub role: UserRole,
    /// Token bearer original, reenviado a los servicios externos
    pub token: Option<String>,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: JwtClaims, token: Option<String>) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name.filter(|n| !n.trim().is_empty()),
            role: UserRole::from_claim(&claims.role),
            token,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Nombre visible; sin claim `name` se usa el id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.user_id)
    }

    pub fn credential(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
