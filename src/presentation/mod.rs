// Presentation layer - HTTP handlers and wire types
pub mod app_state;
pub mod dto;
pub mod handlers;
