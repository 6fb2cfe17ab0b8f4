//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación
//! y fechas.

pub mod dates;
pub mod errors;
pub mod validation;

pub use errors::{AppError, AppResult};
