// src/services/mod.rs

pub mod document_service;
pub mod persistence_service;
pub mod size_registry;
pub mod thumbnail_service;
