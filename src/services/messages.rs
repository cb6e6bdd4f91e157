use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::{Message, SendMessageRequest},
    services::users,
};

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.sender_id, s.username AS sender_username,
           m.recipient_id, r.username AS recipient_username,
           m.subject, m.body, m.is_read, m.created_at
    FROM messages m
    JOIN users s ON s.id = m.sender_id
    JOIN users r ON r.id = m.recipient_id
"#;

fn validate_message(sender_id: i64, request: &SendMessageRequest) -> AppResult<()> {
    if request.recipient_id == sender_id {
        return Err(AppError::InvalidInput(
            "Cannot send a message to yourself".to_string(),
        ));
    }
    let subject_len = request.subject.trim().chars().count();
    if subject_len == 0 || subject_len > 200 {
        return Err(AppError::InvalidInput(
            "Subject must be between 1 and 200 characters".to_string(),
        ));
    }
    let body_len = request.body.trim().chars().count();
    if body_len == 0 || body_len > 5000 {
        return Err(AppError::InvalidInput(
            "Message body must be between 1 and 5000 characters".to_string(),
        ));
    }
    Ok(())
}

/// Sends a private message; both users must exist and differ
pub async fn send_message(
    db_pool: &PgPool,
    sender_id: i64,
    request: SendMessageRequest,
) -> AppResult<Message> {
    validate_message(sender_id, &request)?;

    // The sender must be a real account, the recipient merely has to exist
    users::load_actor(db_pool, sender_id).await?;
    users::ensure_user_exists(db_pool, request.recipient_id).await?;

    let message_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO messages (sender_id, recipient_id, subject, body)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(sender_id)
    .bind(request.recipient_id)
    .bind(request.subject.trim())
    .bind(request.body.trim())
    .fetch_one(db_pool)
    .await?;

    tracing::info!(
        message_id,
        sender_id,
        recipient_id = request.recipient_id,
        "Message sent"
    );

    find_message(db_pool, message_id).await
}

async fn find_message(db_pool: &PgPool, message_id: i64) -> AppResult<Message> {
    sqlx::query_as::<_, Message>(&format!("{MESSAGE_SELECT} WHERE m.id = $1"))
        .bind(message_id)
        .fetch_optional(db_pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))
}

/// Received messages, newest first
pub async fn inbox(db_pool: &PgPool, user_id: i64) -> AppResult<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(&format!(
        "{MESSAGE_SELECT} WHERE m.recipient_id = $1 ORDER BY m.created_at DESC, m.id DESC"
    ))
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(messages)
}

/// Sent messages, newest first
pub async fn sent(db_pool: &PgPool, user_id: i64) -> AppResult<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(&format!(
        "{MESSAGE_SELECT} WHERE m.sender_id = $1 ORDER BY m.created_at DESC, m.id DESC"
    ))
    .bind(user_id)
    .fetch_all(db_pool)
    .await?;
    Ok(messages)
}

/// Opens a message; the recipient reading it marks it read
pub async fn read_message(db_pool: &PgPool, user_id: i64, message_id: i64) -> AppResult<Message> {
    let mut message = find_message(db_pool, message_id).await?;

    // Other users' messages look nonexistent.
    if !message.involves(user_id) {
        return Err(AppError::NotFound(format!(
            "Message {} not found",
            message_id
        )));
    }

    if message.recipient_id == user_id && !message.is_read {
        sqlx::query("UPDATE messages SET is_read = TRUE WHERE id = $1")
            .bind(message_id)
            .execute(db_pool)
            .await?;
        message.is_read = true;
    }

    Ok(message)
}

/// Deletes a message for good; either participant may do it
pub async fn delete_message(db_pool: &PgPool, user_id: i64, message_id: i64) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM messages
        WHERE id = $1 AND (sender_id = $2 OR recipient_id = $2)
        "#,
    )
    .bind(message_id)
    .bind(user_id)
    .execute(db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Message {} not found",
            message_id
        )));
    }
    Ok(())
}

/// Number of unread messages addressed to the user
pub async fn unread_count(db_pool: &PgPool, user_id: i64) -> AppResult<i64> {
    let count = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM messages
        WHERE recipient_id = $1 AND NOT is_read
        "#,
    )
    .bind(user_id)
    .fetch_one(db_pool)
    .await?;
    Ok(count)
}
