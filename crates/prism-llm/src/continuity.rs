//! Delta-only resend tracking for the Responses protocol
//!
//! A completed Responses turn leaves a [`Part::ResponseRef`] marker in the
//! assistant message the caller keeps. When the next request goes out, the
//! most recent marker matching the current model lets us send only the
//! messages after it, referencing the server-held response instead of
//! replaying the whole conversation.

use std::sync::OnceLock;

use dashmap::DashSet;

use crate::types::{ChatMessage, Part, Role};

/// How a request's conversation window should be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuityPlan {
    /// Response id to attach as `previous_response_id`
    pub previous_response_id: Option<String>,
    /// Index of the first message to send; earlier messages are covered by
    /// the referenced server-side response
    pub window_start: usize,
}

impl ContinuityPlan {
    /// Send the full conversation with no continuity reference
    pub const fn full() -> Self {
        Self {
            previous_response_id: None,
            window_start: 0,
        }
    }
}

/// Base URLs that rejected `previous_response_id`
///
/// Grows only and never expires: once a backend proves it does not
/// support the feature, delta sends are never attempted there again for
/// the life of the process.
fn unsupported_base_urls() -> &'static DashSet<String> {
    static SET: OnceLock<DashSet<String>> = OnceLock::new();
    SET.get_or_init(DashSet::new)
}

/// Record that a base URL rejects `previous_response_id`
pub fn mark_unsupported(base_url: &str) {
    unsupported_base_urls().insert(base_url.to_owned());
}

/// Whether delta sends should be skipped for a base URL
pub fn is_unsupported(base_url: &str) -> bool {
    unsupported_base_urls().contains(base_url)
}

/// Decide whether this request can be sent as a delta
///
/// `user_forced_full` is set when the caller supplied an explicit
/// continuity id in extra parameters; manual control always gets the full
/// history.
pub fn plan(base_url: &str, model: &str, messages: &[ChatMessage], user_forced_full: bool) -> ContinuityPlan {
    if user_forced_full || is_unsupported(base_url) {
        return ContinuityPlan::full();
    }

    // Most recent assistant turn carrying a marker for this model
    for (index, msg) in messages.iter().enumerate().rev() {
        if msg.role != Role::Assistant {
            continue;
        }
        let Some((marker_model, response_id)) = msg.response_ref() else {
            continue;
        };
        if marker_model != model {
            continue;
        }
        if index + 1 == messages.len() {
            // The marker is the last message; there is no delta to send
            break;
        }
        return ContinuityPlan {
            previous_response_id: Some(response_id.to_owned()),
            window_start: index + 1,
        };
    }

    ContinuityPlan::full()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn marked_assistant(model: &str, response_id: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            parts: vec![
                Part::Text {
                    text: "earlier answer".to_owned(),
                },
                Part::ResponseRef {
                    model: model.to_owned(),
                    response_id: response_id.to_owned(),
                },
            ],
        }
    }

    #[test]
    fn slices_after_the_most_recent_matching_marker() {
        let messages = vec![
            ChatMessage::user("first"),
            marked_assistant("gpt-5", "resp_1"),
            ChatMessage::user("second"),
            marked_assistant("gpt-5", "resp_2"),
            ChatMessage::user("third"),
        ];

        let plan = plan("http://one.test", "gpt-5", &messages, false);
        assert_eq!(plan.previous_response_id.as_deref(), Some("resp_2"));
        assert_eq!(plan.window_start, 4);
    }

    #[test]
    fn marker_for_another_model_is_ignored() {
        let messages = vec![
            ChatMessage::user("first"),
            marked_assistant("o4-mini", "resp_1"),
            ChatMessage::user("second"),
        ];

        let plan = plan("http://two.test", "gpt-5", &messages, false);
        assert_eq!(plan, ContinuityPlan::full());
    }

    #[test]
    fn marker_as_last_message_sends_full_history() {
        let messages = vec![ChatMessage::user("hi"), marked_assistant("gpt-5", "resp_1")];
        let plan = plan("http://three.test", "gpt-5", &messages, false);
        assert_eq!(plan, ContinuityPlan::full());
    }

    #[test]
    fn user_forced_full_wins_over_markers() {
        let messages = vec![
            marked_assistant("gpt-5", "resp_1"),
            ChatMessage::user("next"),
        ];
        let plan = plan("http://four.test", "gpt-5", &messages, true);
        assert_eq!(plan, ContinuityPlan::full());
    }

    #[test]
    fn unsupported_base_url_disables_delta_sends() {
        let messages = vec![
            marked_assistant("gpt-5", "resp_1"),
            ChatMessage::user("next"),
        ];

        assert!(
            plan("http://five.test", "gpt-5", &messages, false)
                .previous_response_id
                .is_some()
        );

        mark_unsupported("http://five.test");
        assert_eq!(plan("http://five.test", "gpt-5", &messages, false), ContinuityPlan::full());
        // Other base URLs are unaffected
        assert!(
            plan("http://six.test", "gpt-5", &messages, false)
                .previous_response_id
                .is_some()
        );
    }
}
