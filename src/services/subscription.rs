use time::PrimitiveDateTime;

use crate::db::types::SubscriptionStatus;

/// Premium with no expiry, or an expiry still in the future.
pub(crate) fn is_active(
    status: SubscriptionStatus,
    expires_at: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
) -> bool {
    match status {
        SubscriptionStatus::Free => false,
        SubscriptionStatus::Premium => expires_at.map_or(true, |expiry| expiry > now),
    }
}
