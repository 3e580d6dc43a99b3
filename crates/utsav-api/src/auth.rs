use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use utsav_db::models::Insert;
use utsav_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse};
use utsav_types::models::Role;

use crate::extract::ValidatedJson;
use crate::{ApiError, AppState, run_db};

pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let full_name = req.full_name;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let role = if state.admin_emails.contains(&email) { Role::Admin } else { Role::User };
    let user_id = Uuid::new_v4();

    let created = {
        let id = user_id.to_string();
        let email = email.clone();
        run_db(&state, move |db| db.create_account(&id, &email, &password_hash, &full_name, role)).await?
    };
    if let Insert::Duplicate = created {
        return Err(ApiError::Conflict("An account with this email already exists.".into()));
    }

    info!(%user_id, role = role.as_str(), "Account created");

    let token = create_token(&state.jwt_secret, user_id, &email)?;

    Ok((StatusCode::CREATED, Json(SignupResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let invalid = || ApiError::Unauthenticated("Invalid email or password.".into());

    let lookup = email.clone();
    let user = run_db(&state, move |db| db.get_user_by_email(&lookup))
        .await?
        .ok_or_else(invalid)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.email)?;

    Ok(Json(LoginResponse {
        user_id,
        email: user.email,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Asha@Example.COM "), "asha@example.com");
    }

    #[test]
    fn token_round_trips_claims() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id, "asha@example.com").unwrap();
        let decoded = jsonwebtoken::decode::<Claims>(
            &token,
            &jsonwebtoken::DecodingKey::from_secret(b"test-secret"),
            &jsonwebtoken::Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id);
        assert_eq!(decoded.claims.email, "asha@example.com");
    }
}
