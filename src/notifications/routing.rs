//! Where opening a notification takes the user.

use serde_json::Value;

use crate::route::Route;
use crate::types::{NotificationItem, NotificationKind};

/// Route for a notification, or `None` when it has nowhere to go.
#[must_use]
pub fn route_for(item: &NotificationItem) -> Option<Route> {
    let match_id = item
        .data
        .get("matchId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned);

    match item.kind {
        NotificationKind::NewMatch => Some(match_id.map_or(Route::Matches, Route::MessageThread)),
        NotificationKind::NewMessage => Some(match_id.map_or(Route::Messages, Route::MessageThread)),
        NotificationKind::ProfileApproved | NotificationKind::ProfileRejected => Some(Route::ProfileMe),
        NotificationKind::VerificationApproved | NotificationKind::VerificationRejected => {
            Some(Route::VerificationStatus)
        }
        NotificationKind::GuardianAlert => match_id.map(Route::MessageThread),
        NotificationKind::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::notification;
    use serde_json::json;

    fn with_data(kind: NotificationKind, data: Value) -> NotificationItem {
        NotificationItem { data, ..notification("n1", kind, false) }
    }

    #[test]
    fn match_and_message_prefer_thread() {
        let data = json!({ "matchId": "m-1" });
        assert_eq!(
            route_for(&with_data(NotificationKind::NewMatch, data.clone())),
            Some(Route::MessageThread("m-1".into()))
        );
        assert_eq!(
            route_for(&with_data(NotificationKind::NewMessage, data)),
            Some(Route::MessageThread("m-1".into()))
        );
    }

    #[test]
    fn match_and_message_fall_back_to_lists() {
        assert_eq!(route_for(&with_data(NotificationKind::NewMatch, Value::Null)), Some(Route::Matches));
        assert_eq!(
            route_for(&with_data(NotificationKind::NewMessage, json!({ "matchId": "" }))),
            Some(Route::Messages)
        );
    }

    #[test]
    fn moderation_outcomes() {
        for kind in [NotificationKind::ProfileApproved, NotificationKind::ProfileRejected] {
            assert_eq!(route_for(&with_data(kind, Value::Null)), Some(Route::ProfileMe));
        }
        for kind in [NotificationKind::VerificationApproved, NotificationKind::VerificationRejected] {
            assert_eq!(route_for(&with_data(kind, Value::Null)), Some(Route::VerificationStatus));
        }
    }

    #[test]
    fn guardian_alert_needs_match() {
        assert_eq!(route_for(&with_data(NotificationKind::GuardianAlert, Value::Null)), None);
        assert_eq!(
            route_for(&with_data(NotificationKind::GuardianAlert, json!({ "matchId": "m-2" }))),
            Some(Route::MessageThread("m-2".into()))
        );
    }

    #[test]
    fn unknown_kind_goes_nowhere() {
        assert_eq!(route_for(&with_data(NotificationKind::Unknown, json!({ "matchId": "m-3" }))), None);
    }
}
