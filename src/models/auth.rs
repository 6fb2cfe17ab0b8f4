use serde::{Deserialize, Serialize};

/// Roles del sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    /// Cualquier rol desconocido se trata como técnico
    #[serde(other)]
    Tecnico,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Tecnico => "tecnico",
        }
    }

    /// Rol a partir de la etiqueta guardada; desconocido o ausente -> técnico
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_lowercase()).as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::Tecnico,
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}

/// Capacidades de un rol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub create_machine: bool,
    pub edit_machine: bool,
    pub delete_machine: bool,
    pub move_any_machine: bool,
    pub move_own_column: bool,
    pub set_priority: bool,
    pub manage_reservations: bool,
    pub manage_rentals: bool,
    pub manage_service_orders: bool,
    pub delete_service_order: bool,
    pub view_reports: bool,
    pub manage_backups: bool,
    pub manage_users: bool,
    pub complete_part_requests: bool,
    pub finalize_general: bool,
    pub add_observations: bool,
    pub manage_tasks: bool,
}

/// Capacidades resueltas para una sesión
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub role: Role,
    pub technician: Option<String>,
    #[serde(flatten)]
    pub capabilities: Capabilities,
}

/// Sesión autenticada que viaja explícitamente en cada request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub technician: Option<String>,
    pub display_name: String,
}

impl SessionContext {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// ¿Es el técnico indicado?
    pub fn is_technician(&self, technician: &str) -> bool {
        !self.is_admin() && self.technician.as_deref() == Some(technician)
    }
}

/// Claims del JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub email: String,
    pub role: Role,
    pub technician: Option<String>,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl From<JwtClaims> for SessionContext {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            technician: claims.technician,
            display_name: claims.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_role_is_technician() {
        assert_eq!(Role::from_tag(Some("admin")), Role::Admin);
        assert_eq!(Role::from_tag(Some("gestor")), Role::Tecnico);
        assert_eq!(Role::from_tag(None), Role::Tecnico);

        let role: Role = serde_json::from_value(json!("supervisor")).unwrap();
        assert_eq!(role, Role::Tecnico);
    }
}
