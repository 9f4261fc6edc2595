pub mod documents;
pub mod dto;
pub mod editor;
pub mod ports;
pub mod services;
pub mod session;
pub mod stream_client;
