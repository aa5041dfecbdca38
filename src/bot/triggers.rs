// Trigger dispatch - feeds submission events into the core gate service.

use crate::core::moderation::{
    AccountGateService, GateAction, ModerationPlatform, RuleKind, SettingsStore, TriggerEvent,
};

/// Run both gate rules for one event.
///
/// The rules are invoked independently: a platform failure in one rule is
/// logged here and does not stop the other rule from evaluating. Returns
/// the actions that were executed.
pub async fn handle_event<P, S>(
    service: &AccountGateService<P, S>,
    event: &TriggerEvent,
) -> Vec<GateAction>
where
    P: ModerationPlatform,
    S: SettingsStore,
{
    let mut actions = Vec::new();

    for rule in RuleKind::ALL {
        match service.evaluate_rule(event, rule).await {
            Ok(executed) => {
                if !executed.is_empty() {
                    tracing::info!(%rule, count = executed.len(), "Gate rule executed actions");
                }
                actions.extend(executed);
            }
            Err(e) => {
                tracing::error!(%rule, error = %e, "Gate rule failed");
            }
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::{
        AuthorProfile, AuthorRef, ContentKind, ContentRef, EventKind, GateError, GateSettings,
        SubredditRef,
    };
    use crate::infra::settings::InMemorySettingsStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::{Arc, Mutex};

    /// Platform whose PM endpoint is down. Everything else succeeds.
    struct FlakyPmPlatform {
        profile: AuthorProfile,
        removed: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ModerationPlatform for FlakyPmPlatform {
        async fn fetch_author(&self, _user_id: &str) -> Result<AuthorProfile, GateError> {
            Ok(self.profile.clone())
        }

        async fn is_approved_user(
            &self,
            _subreddit: &str,
            _username: &str,
        ) -> Result<bool, GateError> {
            Ok(false)
        }

        async fn remove_content(&self, content_id: &str) -> Result<(), GateError> {
            self.removed.lock().unwrap().push(content_id.to_string());
            Ok(())
        }

        async fn send_private_message(
            &self,
            _to: &str,
            _subject: &str,
            _text: &str,
        ) -> Result<(), GateError> {
            Err(GateError::Platform("compose is down".to_string()))
        }

        async fn submit_comment(&self, _parent_id: &str, _text: &str) -> Result<(), GateError> {
            Ok(())
        }
    }

    fn post_event() -> TriggerEvent {
        TriggerEvent {
            kind: EventKind::PostSubmit,
            post: Some(ContentRef {
                id: "t3_abc".to_string(),
            }),
            comment: None,
            author: Some(AuthorRef {
                id: "t2_user".to_string(),
                name: "newuser".to_string(),
            }),
            subreddit: SubredditRef {
                name: "rustlang".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_one_rule_failing_does_not_stop_the_other() {
        let removed = Arc::new(Mutex::new(Vec::new()));
        let platform = FlakyPmPlatform {
            profile: AuthorProfile {
                created_at: Utc::now() - Duration::days(1),
                karma: Some(5),
            },
            removed: Arc::clone(&removed),
        };

        // Age rule sends a PM (which will fail); karma rule does not.
        let mut settings = GateSettings::default();
        settings.karma.applies_to = vec![ContentKind::Post, ContentKind::Comment];
        settings.karma.threshold = 100;
        settings.karma.send_pm = false;
        let store = InMemorySettingsStore::new(settings);

        let service = AccountGateService::new(platform, store);
        let actions = handle_event(&service, &post_event()).await;

        // The age rule's failure swallowed its action list, but its removal
        // already happened; the karma rule then removed again and reported.
        assert_eq!(*removed.lock().unwrap(), vec!["t3_abc", "t3_abc"]);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], GateAction::RemoveContent { .. }));
    }

    #[tokio::test]
    async fn test_clean_event_produces_no_actions() {
        let platform = FlakyPmPlatform {
            profile: AuthorProfile {
                created_at: Utc::now() - Duration::days(400),
                karma: Some(10_000),
            },
            removed: Arc::new(Mutex::new(Vec::new())),
        };
        let store = InMemorySettingsStore::new(GateSettings::default());

        let service = AccountGateService::new(platform, store);
        let actions = handle_event(&service, &post_event()).await;

        assert!(actions.is_empty());
    }
}
