pub mod auth_controller;
pub mod backup_controller;
pub mod extraction_controller;
pub mod machine_controller;
pub mod notification_controller;
pub mod part_request_controller;
pub mod report_controller;
pub mod service_order_controller;
pub mod user_controller;
