//! The four protocol phases, in their fixed order:
//!
//! 1. [`HandshakePhase`] - KEM-based transport handshake and session-key agreement
//! 2. [`AuthenticationPhase`] - OpenID Connect authorization request and code
//! 3. [`TokenIssuancePhase`] - signed ID token bound to the client ephemeral key
//! 4. [`ResourceAccessPhase`] - proof-of-possession challenge/response

mod authentication;
mod handshake;
mod resource_access;
mod token_issuance;

pub use authentication::AuthenticationPhase;
pub use handshake::HandshakePhase;
pub use resource_access::ResourceAccessPhase;
pub use token_issuance::TokenIssuancePhase;

use crate::core::DemoPhase;

pub const CLIENT_ID: &str = "demo_client";
pub const REDIRECT_URI: &str = "http://localhost:8080/callback";
pub const AUTH_SERVER_URL: &str = "http://localhost:5000";
pub const SCOPE: &str = "openid profile email";
pub const NONCE: &str = "demo_nonce_12345";
pub const SUBJECT: &str = "alice@example.com";
pub const SUBJECT_NAME: &str = "Alice Smith";

/// ID token lifetime in seconds
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// All phases in execution order.
pub fn standard_sequence() -> Vec<Box<dyn DemoPhase>> {
    vec![
        Box::new(HandshakePhase),
        Box::new(AuthenticationPhase),
        Box::new(TokenIssuancePhase),
        Box::new(ResourceAccessPhase),
    ]
}

/// Shorten an artifact for display in a log line.
fn preview(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_order() {
        let indices: Vec<u8> = standard_sequence()
            .iter()
            .map(|phase| phase.descriptor().index)
            .collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sequence_names() {
        let names: Vec<&str> = standard_sequence()
            .iter()
            .map(|phase| phase.descriptor().name)
            .collect();
        assert_eq!(
            names,
            vec![
                "KEMTLS Handshake",
                "User Authentication",
                "Token Issuance",
                "Resource Access"
            ]
        );
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("AUTH_CODE_0123456789abcdef", 10), "AUTH_CODE_...");
        assert_eq!(preview("short", 10), "short");
    }
}
