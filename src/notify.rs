use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    error::AppResult,
    mailer::OutgoingMail,
    models::{NewNotification, Notification},
    schema::{notifications, users},
    state::{AppState, PgPooledConnection},
};

/// Stores an in-app notification for `user_id`.
pub fn record(
    conn: &mut PgConnection,
    user_id: Uuid,
    title: &str,
    message: &str,
) -> AppResult<Notification> {
    let notification = diesel::insert_into(notifications::table)
        .values(&NewNotification {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            message: message.to_string(),
        })
        .get_result(conn)?;
    Ok(notification)
}

/// Records the notification and mails the user. Mail delivery failures are
/// logged and swallowed.
pub async fn notify_user(
    state: &AppState,
    conn: &mut PgPooledConnection,
    user_id: Uuid,
    title: &str,
    message: &str,
) -> AppResult<()> {
    record(conn, user_id, title, message)?;

    let email: Option<String> = users::table
        .find(user_id)
        .select(users::email)
        .first(conn)
        .optional()?;

    let Some(to) = email else {
        return Ok(());
    };

    let mail = OutgoingMail {
        to,
        subject: title.to_string(),
        body: message.to_string(),
    };
    if let Err(err) = state.mailer.send(mail).await {
        tracing::warn!(user_id = %user_id, error = %err, "failed to deliver notification mail");
    }
    Ok(())
}
