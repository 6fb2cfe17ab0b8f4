//! The Watcher: backend de gestión del taller de empilhadores
//!
//! Máquinas, órdenes de servicio, pedidos de piezas y notificaciones sobre
//! un almacén de entidades remoto (o en memoria para desarrollo y tests).

pub mod cache;
pub mod clients;
pub mod config;
pub mod controllers;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
