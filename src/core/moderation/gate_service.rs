// Account gate service - core business logic for the moderation gate.
//
// On each submission event the gate:
// - classifies the event (post/comment, anything else is ignored)
// - checks rule applicability and exemptions
// - fetches the author's live profile
// - compares the metric (account age in days, or karma) to the threshold
// - on failure removes the content and optionally notifies the author
//
// NO Reddit dependencies here - just pure domain logic behind trait ports.

use super::gate_models::{
    AuthorProfile, ContentKind, GateAction, GateSettings, RuleConfig, RuleKind, RuleVerdict,
    TriggerEvent,
};
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed platform response: {0}")]
    MalformedResponse(String),
}

// ============================================================================
// PLATFORM TRAIT (PORT)
// ============================================================================

/// Capability surface the gate requires of the platform.
///
/// Calls are not retried; any error aborts the remainder of the current
/// rule's action sequence and propagates to the caller.
#[async_trait]
pub trait ModerationPlatform: Send + Sync {
    /// Fetch the author's profile by user fullname.
    async fn fetch_author(&self, user_id: &str) -> Result<AuthorProfile, GateError>;

    /// Whether the user is on the subreddit's approved-user list.
    async fn is_approved_user(&self, subreddit: &str, username: &str)
        -> Result<bool, GateError>;

    /// Remove the content. Treated as idempotent by intent: removing
    /// already-removed content is not expected to error.
    async fn remove_content(&self, content_id: &str) -> Result<(), GateError>;

    /// Send a private message to a user.
    async fn send_private_message(
        &self,
        to: &str,
        subject: &str,
        text: &str,
    ) -> Result<(), GateError>;

    /// Leave a moderator-distinguished comment on the content.
    async fn submit_comment(&self, parent_id: &str, text: &str) -> Result<(), GateError>;
}

// ============================================================================
// SETTINGS TRAIT (PORT)
// ============================================================================

/// Trait for loading operator policy.
///
/// Settings are loaded fresh at the start of each evaluation and never
/// mutated by the gate, so operator edits take effect on the next event.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<GateSettings, GateError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// The moderation rule evaluator.
///
/// Holds no state across invocations: every evaluation works on its own
/// event, a fresh settings load, and live author data.
pub struct AccountGateService<P: ModerationPlatform, S: SettingsStore> {
    platform: P,
    settings: S,
}

impl<P: ModerationPlatform, S: SettingsStore> AccountGateService<P, S> {
    /// Create a new gate service over the given platform and settings store.
    pub fn new(platform: P, settings: S) -> Self {
        Self { platform, settings }
    }

    /// Evaluate one event against both rules, in order: account age, then
    /// karma.
    ///
    /// Returns every action that was executed. The rules are independent:
    /// an event that fails both is removed, messaged, and commented on
    /// twice. A platform error aborts the remaining actions and propagates,
    /// so callers that want one rule's failure not to suppress the other
    /// should use [`evaluate_rule`](Self::evaluate_rule) per rule instead.
    #[allow(dead_code)]
    pub async fn evaluate(&self, event: &TriggerEvent) -> Result<Vec<GateAction>, GateError> {
        let settings = self.settings.load().await?;

        let mut actions = Vec::new();
        for rule in RuleKind::ALL {
            actions.extend(self.apply_rule(event, rule, &settings).await?);
        }
        Ok(actions)
    }

    /// Evaluate a single rule against one event, with its own settings load.
    pub async fn evaluate_rule(
        &self,
        event: &TriggerEvent,
        rule: RuleKind,
    ) -> Result<Vec<GateAction>, GateError> {
        let settings = self.settings.load().await?;
        self.apply_rule(event, rule, &settings).await
    }

    /// Run one rule: filter, fetch, compare, and act on failure.
    async fn apply_rule(
        &self,
        event: &TriggerEvent,
        rule: RuleKind,
        settings: &GateSettings,
    ) -> Result<Vec<GateAction>, GateError> {
        let config = settings.rule(rule);

        let Some(kind) = event.content_kind() else {
            tracing::debug!(%rule, "Ignoring unsupported event type");
            return Ok(Vec::new());
        };

        if !config.covers(kind) {
            return Ok(Vec::new());
        }

        // Malformed events are skipped, not treated as errors.
        let Some(content_id) = event.content_id() else {
            tracing::warn!(%rule, %kind, "Event carries no content id, skipping");
            return Ok(Vec::new());
        };
        let Some(author) = event.author.as_ref().filter(|a| !a.id.is_empty()) else {
            tracing::warn!(%rule, %kind, content_id, "Event carries no author, skipping");
            return Ok(Vec::new());
        };

        let subreddit = event.subreddit.name.as_str();

        if config.ignore_approved_users
            && self.platform.is_approved_user(subreddit, &author.name).await?
        {
            tracing::debug!(%rule, author = %author.name, "Author is approved, skipping");
            return Ok(Vec::new());
        }

        if settings.is_exempt(&author.name) {
            tracing::debug!(%rule, author = %author.name, "Author is exempt, skipping");
            return Ok(Vec::new());
        }

        let profile = self.platform.fetch_author(&author.id).await?;

        let metric = match rule {
            RuleKind::AccountAge => profile.age_days(Utc::now()),
            RuleKind::Karma => profile.karma.unwrap_or(0),
        };
        let verdict = RuleVerdict::new(rule, metric, config.threshold);

        if verdict.passed {
            tracing::debug!(
                %rule,
                author = %author.name,
                metric,
                threshold = config.threshold,
                "Rule passed"
            );
            return Ok(Vec::new());
        }

        let message = render_message(kind, &verdict, config);

        let mut actions = Vec::new();

        self.platform.remove_content(content_id).await?;
        actions.push(GateAction::RemoveContent {
            content_id: content_id.to_string(),
        });

        if config.send_pm {
            let subject = format!("{} removed from r/{}", kind.capitalized(), subreddit);
            self.platform
                .send_private_message(&author.name, &subject, &message)
                .await?;
            actions.push(GateAction::SendPrivateMessage {
                to: author.name.clone(),
                subject,
                text: message.clone(),
            });
        }

        if config.leave_comment {
            self.platform.submit_comment(content_id, &message).await?;
            actions.push(GateAction::SubmitComment {
                parent_id: content_id.to_string(),
                text: message,
            });
        }

        tracing::info!(
            %rule,
            %kind,
            content_id,
            author = %author.name,
            metric,
            threshold = config.threshold,
            "Removed content"
        );

        Ok(actions)
    }
}

/// Render the removal message for a failed verdict.
///
/// Custom templates get every occurrence of their placeholders replaced:
/// `{age}`/`{minimum}` for the age rule, `{karma}`/`{minimum}` for the
/// karma rule. Without a template a fixed default sentence is used.
fn render_message(kind: ContentKind, verdict: &RuleVerdict, config: &RuleConfig) -> String {
    let metric = verdict.metric.to_string();
    let minimum = verdict.threshold.to_string();

    match (config.custom_message(), verdict.rule) {
        (Some(template), RuleKind::AccountAge) => template
            .replace("{age}", &metric)
            .replace("{minimum}", &minimum),
        (Some(template), RuleKind::Karma) => template
            .replace("{karma}", &metric)
            .replace("{minimum}", &minimum),
        (None, RuleKind::AccountAge) => format!(
            "Your {kind} has been removed because your account is less than \
             {minimum} days old. Your account is currently {metric} days old."
        ),
        (None, RuleKind::Karma) => format!(
            "Your {kind} has been removed because your account has less than \
             {minimum} karma. Your account currently has {metric} karma."
        ),
    }
}

// ============================================================================
// TESTS
// ============================================================================
