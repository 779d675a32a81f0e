pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use extractors::CurrentUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

lazy_static! {
    // alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Payload of `POST /api/auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Payload of `POST /api/auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// 3 to 32 characters: letters, digits, underscores or hyphens.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Returned by both login and registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_login_request_validation() {
        let cases = [
            ("member@example.com", "secret-pass", true),
            ("member.example.com", "secret-pass", false),
            ("member@example.com", "12345", false),
        ];
        for (email, password, valid) in cases {
            let login = LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            };
            assert_eq!(login.validate().is_ok(), valid, "{} / {}", email, password);
        }
    }

    #[test]
    fn test_register_request_username_rules() {
        assert!(register("dj_member-42", "dj@example.com", "secret-pass")
            .validate()
            .is_ok());

        let too_long = "d".repeat(33);
        for username in ["dj member!", "dj", "émile", too_long.as_str()] {
            let errors = register(username, "dj@example.com", "secret-pass")
                .validate()
                .unwrap_err();
            assert!(errors.field_errors().contains_key("username"), "{}", username);
        }
    }

    #[test]
    fn test_register_request_reports_every_field() {
        let errors = register("ok_name", "nope", "123").validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("username"));
    }
}
