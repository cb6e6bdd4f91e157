use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{LoginRequest, RegisterRequest, User, UserProfile},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, bio, created_at";

fn validate_registration(request: &RegisterRequest) -> AppResult<()> {
    let username = request.username.trim();
    if username.len() < 3 || username.len() > 32 {
        return Err(AppError::InvalidInput(
            "Username must be between 3 and 32 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::InvalidInput(
            "Username may only contain letters, digits and underscores".to_string(),
        ));
    }
    let email = request.email.trim();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::InvalidInput("Invalid email".to_string()));
    }
    if request.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

/// Argon2id hash with a fresh random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// False for a wrong password and for a hash that does not parse
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Creates an account with an Argon2 password hash
pub async fn register(db_pool: &PgPool, request: RegisterRequest) -> AppResult<User> {
    validate_registration(&request)?;

    // Argon2 is CPU bound, keep it off the async workers
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let bio = request
        .bio
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password_hash, bio)
         VALUES ($1, $2, $3, $4)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(request.username.trim())
    .bind(request.email.trim().to_lowercase())
    .bind(password_hash)
    .bind(bio)
    .fetch_one(db_pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Username or email already taken"))?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Checks a username/password pair. Issuing a session is left to the caller.
pub async fn verify_credentials(db_pool: &PgPool, request: LoginRequest) -> AppResult<User> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(request.username.trim())
        .fetch_optional(db_pool)
        .await?;

    let Some(user) = user else {
        tracing::debug!(username = %request.username, "Login for unknown user");
        return Err(AppError::Unauthorized);
    };

    let hash = user.password_hash.clone();
    let password = request.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !valid {
        tracing::debug!(user_id = user.id, "Login with wrong password");
        return Err(AppError::Unauthorized);
    }

    Ok(user)
}

pub async fn find_user(db_pool: &PgPool, user_id: i64) -> AppResult<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

/// Loads the acting user; an id that matches no account is unauthorized
pub async fn load_actor(db_pool: &PgPool, user_id: i64) -> AppResult<User> {
    find_user(db_pool, user_id)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Loads the acting user and rejects anyone without the admin role
pub async fn require_admin(db_pool: &PgPool, user_id: i64) -> AppResult<User> {
    let user = load_actor(db_pool, user_id).await?;
    if !user.is_admin() {
        tracing::warn!(user_id, "Non-admin attempted admin operation");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}

/// NotFound unless an account with this id exists
pub async fn ensure_user_exists(db_pool: &PgPool, user_id: i64) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(db_pool)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("User {} not found", user_id)))
    }
}

/// Public profile with published post and follow counts
pub async fn get_profile(db_pool: &PgPool, user_id: i64) -> AppResult<UserProfile> {
    let user = find_user(db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    let (published_posts, followers, following): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM posts WHERE author_id = $1 AND status = 'published'),
            (SELECT COUNT(*) FROM user_follows WHERE followed_id = $1),
            (SELECT COUNT(*) FROM user_follows WHERE follower_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;

    Ok(UserProfile {
        id: user.id,
        username: user.username,
        role: user.role,
        bio: user.bio,
        created_at: user.created_at,
        published_posts,
        followers,
        following,
    })
}
