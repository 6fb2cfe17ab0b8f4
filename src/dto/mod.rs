//! DTOs de la API
//!
//! Cuerpos de request y response de los controladores.

pub mod auth_dto;
pub mod common_dto;
pub mod extraction_dto;
pub mod machine_dto;
pub mod notification_dto;
pub mod part_request_dto;
pub mod report_dto;
pub mod service_order_dto;
pub mod user_dto;

pub use common_dto::{ApiResponse, CountResponse};
