//! Resolución de permisos
//!
//! Tabla estática de dos filas (admin, técnico). Función total y pura: un rol
//! desconocido o ausente recibe la fila de técnico.

use crate::models::machine::MachineState;
use crate::models::{Capabilities, Permissions, Role, SessionContext};

const ADMIN_CAPABILITIES: Capabilities = Capabilities {
    create_machine: true,
    edit_machine: true,
    delete_machine: true,
    move_any_machine: true,
    move_own_column: true,
    set_priority: true,
    manage_reservations: true,
    manage_rentals: true,
    manage_service_orders: true,
    delete_service_order: true,
    view_reports: true,
    manage_backups: true,
    manage_users: true,
    complete_part_requests: true,
    finalize_general: true,
    add_observations: true,
    manage_tasks: true,
};

const TECHNICIAN_CAPABILITIES: Capabilities = Capabilities {
    create_machine: false,
    edit_machine: false,
    delete_machine: false,
    move_any_machine: false,
    move_own_column: true,
    set_priority: false,
    manage_reservations: false,
    manage_rentals: false,
    manage_service_orders: false,
    delete_service_order: false,
    view_reports: false,
    manage_backups: false,
    manage_users: false,
    complete_part_requests: false,
    finalize_general: false,
    add_observations: true,
    manage_tasks: true,
};

/// Capacidades para un rol y un técnico opcional
pub fn resolve_permissions(role: Option<&str>, technician: Option<&str>) -> Permissions {
    let role = Role::from_tag(role);
    let capabilities = match role {
        Role::Admin => ADMIN_CAPABILITIES,
        Role::Tecnico => TECHNICIAN_CAPABILITIES,
    };
    Permissions {
        role,
        technician: technician.map(str::to_string),
        capabilities,
    }
}

pub fn permissions_for(session: &SessionContext) -> Permissions {
    resolve_permissions(Some(session.role.as_str()), session.technician.as_deref())
}

impl Permissions {
    /// Admin siempre; técnico solo hacia su propia columna
    pub fn can_move_machine_to(&self, target_technician: Option<&str>, _target_state: &MachineState) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Tecnico => target_technician == self.technician.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_roles_get_technician_row() {
        let technician = resolve_permissions(Some("tecnico"), Some("nuno")).capabilities;
        for role in [None, Some(""), Some("gestor"), Some("ADMINISTRADOR")] {
            assert_eq!(resolve_permissions(role, Some("nuno")).capabilities, technician);
        }
        assert_ne!(resolve_permissions(Some("admin"), None).capabilities, technician);
    }

    #[test]
    fn test_admin_can_move_anywhere() {
        let admin = resolve_permissions(Some("admin"), None);
        assert!(admin.can_move_machine_to(Some("nuno"), &MachineState::InPreparation("nuno".into())));
        assert!(admin.can_move_machine_to(None, &MachineState::DoneGeneral));
    }

    #[test]
    fn test_technician_moves_only_to_own_column() {
        let nuno = resolve_permissions(Some("tecnico"), Some("nuno"));
        let state = MachineState::InPreparation("nuno".into());
        assert!(nuno.can_move_machine_to(Some("nuno"), &state));
        assert!(!nuno.can_move_machine_to(Some("joao"), &state));
        assert!(!nuno.can_move_machine_to(None, &MachineState::Todo));
    }

    #[test]
    fn test_technician_capabilities() {
        let caps = resolve_permissions(Some("tecnico"), Some("nuno")).capabilities;
        assert!(caps.move_own_column);
        assert!(caps.add_observations);
        assert!(!caps.delete_machine);
        assert!(!caps.manage_backups);
    }
}
