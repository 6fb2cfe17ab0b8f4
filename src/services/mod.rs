//! Services module
//!
//! Este módulo contiene la lógica de negocio de la oficina: permisos,
//! transiciones de estado, duplicados, pesquisa, notificações, backups,
//! relatórios y extracción por IA.

pub mod auth_service;
pub mod backup_service;
pub mod duplicate_guard;
pub mod extraction_service;
pub mod jwt_service;
pub mod notification_service;
pub mod permission_service;
pub mod report_service;
pub mod search_service;
pub mod status_service;

pub use auth_service::AuthService;
pub use backup_service::BackupService;
pub use jwt_service::{JwtConfig, JwtService};
pub use notification_service::NotificationHub;
pub use permission_service::{permissions_for, resolve_permissions};
pub use status_service::{transition, Transition};
