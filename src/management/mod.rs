mod auth;

pub use auth::{TokenManager, refresh_token, token_from_json};
