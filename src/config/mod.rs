//! Configuración del proyecto
//!
//! Este módulo contiene la configuración del backend externo, variables de
//! entorno y otras configuraciones del sistema.

pub mod backend;
pub mod environment;

pub use backend::{BackendConfig, EntityBackend};
pub use environment::*;
