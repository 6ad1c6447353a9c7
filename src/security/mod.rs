pub mod webhook_auth;

pub use webhook_auth::{WebhookAuthenticator, constant_time_equal};
