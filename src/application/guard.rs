//! # Membership Guard
//!
//! "Is this user currently a member, admin or owner of the target group?"
//! Lookup failures count as "not a member".

use crate::domain::traits::ChatProvider;
use crate::domain::types::UserRef;

pub async fn is_member(chat: &dyn ChatProvider, chat_id: i64, user: &UserRef) -> bool {
    match chat.member_status(chat_id, user.id).await {
        Ok(status) if status.is_participant() => true,
        Ok(status) => {
            tracing::warn!(
                uid = user.id,
                username = user.display_name(),
                "User not in chat {} ({:?})",
                chat_id,
                status
            );
            false
        }
        Err(e) => {
            tracing::warn!(
                uid = user.id,
                username = user.display_name(),
                "Member lookup in chat {} failed: {}",
                chat_id,
                e
            );
            false
        }
    }
}
