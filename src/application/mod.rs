pub mod annotator;
pub mod ports;
pub mod reporter;
pub mod services;
pub mod session;
