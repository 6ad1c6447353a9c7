pub mod ai_proxy_service;
pub mod billing;
pub mod layout;

pub use ai_proxy_service::{AiProxyService, AiTask};
