//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean a las colecciones
//! del backend de entidades, con sus nombres de campo originales.

pub mod auth;
pub mod backup;
pub mod machine;
pub mod notification;
pub mod part_request;
pub mod report;
pub mod service_order;
pub mod user;

pub use auth::{Capabilities, JwtClaims, Permissions, Role, SessionContext};
pub use machine::{Machine, MachineState, Origem};
pub use notification::{Notification, NotificationKind, NotificationTarget};
pub use part_request::{PartRequest, PartRequestStatus};
pub use service_order::{OrderPriority, OrderStatus, ServiceOrder};
pub use user::User;
