use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Hours a freshly issued token stays valid.
const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Claims carried by a member's session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Member id.
    pub sub: i32,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET").map_err(|_| {
        log::error!("JWT_SECRET is not set; tokens cannot be issued or verified");
        AppError::InternalServerError("JWT_SECRET not set".into())
    })
}

/// Issues a signed token for `user_id`, valid for 24 hours.
///
/// Signs with the `JWT_SECRET` environment variable.
pub fn generate_token(user_id: i32) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(TOKEN_LIFETIME_HOURS))
        .ok_or_else(|| AppError::InternalServerError("Token expiry out of range".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret()?.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies signature and expiry of `token` and returns its claims.
///
/// A malformed, forged or expired token yields `AppError::Unauthorized`.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = jwt_secret()?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lazy_static::lazy_static;

    lazy_static! {
        pub(crate) static ref JWT_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    }

    /// Runs `test_logic` with `JWT_SECRET` temporarily set to `secret_value`.
    pub(crate) fn run_with_temp_jwt_secret<F>(secret_value: &str, test_logic: F)
    where
        F: FnOnce(),
    {
        let _guard = JWT_ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let original_secret_val = std::env::var("JWT_SECRET").ok();
        std::env::set_var("JWT_SECRET", secret_value);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(test_logic));

        match original_secret_val {
            Some(original) => std::env::set_var("JWT_SECRET", original),
            None => std::env::remove_var("JWT_SECRET"),
        }

        if let Err(panic_payload) = result {
            std::panic::resume_unwind(panic_payload);
        }
    }

    #[test]
    fn test_token_generation_and_verification() {
        run_with_temp_jwt_secret("test_secret_for_gen_verify", || {
            let token = generate_token(7).unwrap();
            let claims = verify_token(&token).unwrap();
            assert_eq!(claims.sub, 7);
        });
    }

    #[test]
    fn test_token_expiration() {
        run_with_temp_jwt_secret("test_secret_for_expiration", || {
            let expired = Claims {
                sub: 2,
                exp: chrono::Utc::now()
                    .checked_sub_signed(chrono::Duration::hours(2))
                    .unwrap()
                    .timestamp() as usize,
            };
            let expired_token = encode(
                &Header::default(),
                &expired,
                &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
            )
            .unwrap();

            match verify_token(&expired_token) {
                Err(AppError::Unauthorized(msg)) => {
                    assert!(msg.contains("ExpiredSignature"), "unexpected message: {}", msg)
                }
                other => panic!("Expected an expired token error, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = {
            let mut token = None;
            run_with_temp_jwt_secret("first_secret", || {
                token = Some(generate_token(3).unwrap());
            });
            token.unwrap()
        };

        run_with_temp_jwt_secret("second_secret", || {
            assert!(matches!(
                verify_token(&token),
                Err(AppError::Unauthorized(_))
            ));
        });
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        run_with_temp_jwt_secret("garbage_secret", || {
            assert!(matches!(
                verify_token("not-a-jwt"),
                Err(AppError::Unauthorized(_))
            ));
        });
    }
}
