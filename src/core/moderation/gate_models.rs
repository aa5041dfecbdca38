// Moderation domain models - data structures for the account gate.
//
// These are pure domain types with no Reddit dependencies.
// The infra layer converts these to and from Reddit API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw trigger event type as delivered on the wire.
///
/// Anything other than a post or comment submission deserializes to
/// `Unknown` and is ignored by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    PostSubmit,
    CommentSubmit,
    Unknown,
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let kind = String::deserialize(deserializer)?;
        Ok(match kind.as_str() {
            "PostSubmit" => EventKind::PostSubmit,
            "CommentSubmit" => EventKind::CommentSubmit,
            _ => EventKind::Unknown,
        })
    }
}

/// The kind of content a rule is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Post,
    Comment,
}

impl ContentKind {
    /// Capitalized form for PM subjects ("Post removed from r/...").
    pub fn capitalized(&self) -> &'static str {
        match self {
            ContentKind::Post => "Post",
            ContentKind::Comment => "Comment",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Post => write!(f, "post"),
            ContentKind::Comment => write!(f, "comment"),
        }
    }
}

/// Reference to the submitted content inside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: String,
}

/// Reference to the content author inside an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
}

/// Reference to the subreddit the event happened in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubredditRef {
    pub name: String,
}

/// One submission notification, consumed once and discarded.
///
/// Wire shape:
/// `{ "type": "PostSubmit", "post": {"id": ...}, "author": {"id": ..., "name": ...}, "subreddit": {"name": ...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub post: Option<ContentRef>,
    #[serde(default)]
    pub comment: Option<ContentRef>,
    #[serde(default)]
    pub author: Option<AuthorRef>,
    #[serde(default)]
    pub subreddit: SubredditRef,
}

impl TriggerEvent {
    /// Classify the event. `None` for kinds the gate does not handle.
    pub fn content_kind(&self) -> Option<ContentKind> {
        match self.kind {
            EventKind::PostSubmit => Some(ContentKind::Post),
            EventKind::CommentSubmit => Some(ContentKind::Comment),
            EventKind::Unknown => None,
        }
    }

    /// The fullname of the submitted content, if the event carries one.
    ///
    /// A `PostSubmit` event is only valid with a `post` ref and a
    /// `CommentSubmit` event with a `comment` ref; an empty id counts
    /// as absent.
    pub fn content_id(&self) -> Option<&str> {
        let content = match self.kind {
            EventKind::PostSubmit => self.post.as_ref(),
            EventKind::CommentSubmit => self.comment.as_ref(),
            EventKind::Unknown => None,
        };
        content.map(|c| c.id.as_str()).filter(|id| !id.is_empty())
    }
}

/// Author metadata fetched live from the platform, once per evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorProfile {
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Total karma. Missing from some profile payloads, in which case
    /// the karma rule treats it as 0.
    pub karma: Option<i64>,
}

impl AuthorProfile {
    /// Whole days between account creation and `now`.
    ///
    /// Uses the absolute difference so a creation timestamp in the
    /// future still yields a non-negative age.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).abs().num_days()
    }
}

/// Which of the two gate rules is being evaluated.
///
/// Rules run in a fixed order: account age, then karma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    AccountAge,
    Karma,
}

impl RuleKind {
    /// Both rules, in evaluation order.
    pub const ALL: [RuleKind; 2] = [RuleKind::AccountAge, RuleKind::Karma];
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::AccountAge => write!(f, "account-age"),
            RuleKind::Karma => write!(f, "karma"),
        }
    }
}

/// Operator policy for a single rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Which content kinds this rule applies to. Empty disables the rule.
    #[serde(default)]
    pub applies_to: Vec<ContentKind>,
    /// Minimum account age in days / minimum karma. Unsigned, so negative
    /// values are rejected while the settings are being deserialized.
    #[serde(default)]
    pub threshold: u32,
    /// Custom removal message. `{age}`/`{karma}` and `{minimum}` are
    /// substituted; an empty string counts as unset.
    #[serde(default)]
    pub removal_message: Option<String>,
    /// Send a private message to the author when content is removed.
    #[serde(default = "default_true")]
    pub send_pm: bool,
    /// Leave a distinguished removal comment on the content.
    #[serde(default)]
    pub leave_comment: bool,
    /// Skip authors on the subreddit's approved-user list.
    #[serde(default)]
    pub ignore_approved_users: bool,
}

fn default_true() -> bool {
    true
}

impl RuleConfig {
    /// Whether this rule applies to the given content kind.
    pub fn covers(&self, kind: ContentKind) -> bool {
        self.applies_to.contains(&kind)
    }

    /// The configured removal message, treating an empty string as unset.
    pub fn custom_message(&self) -> Option<&str> {
        self.removal_message.as_deref().filter(|m| !m.is_empty())
    }
}

/// Full operator policy for the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSettings {
    #[serde(default = "GateSettings::default_account_age")]
    pub account_age: RuleConfig,
    #[serde(default = "GateSettings::default_karma")]
    pub karma: RuleConfig,
    /// Authors never moderated by the gate, compared case-insensitively.
    #[serde(default = "GateSettings::default_exempt_users")]
    pub exempt_users: Vec<String>,
}

impl GateSettings {
    fn default_account_age() -> RuleConfig {
        RuleConfig {
            applies_to: vec![ContentKind::Post, ContentKind::Comment],
            threshold: 30, // days
            removal_message: None,
            send_pm: true,
            leave_comment: false,
            ignore_approved_users: false,
        }
    }

    // Disabled until the operator opts in: karma can be negative, so even
    // a zero threshold would fire on downvoted accounts.
    fn default_karma() -> RuleConfig {
        RuleConfig {
            applies_to: Vec::new(),
            threshold: 0,
            removal_message: None,
            send_pm: true,
            leave_comment: false,
            ignore_approved_users: false,
        }
    }

    fn default_exempt_users() -> Vec<String> {
        vec!["AutoModerator".to_string()]
    }

    /// The config for one rule.
    pub fn rule(&self, kind: RuleKind) -> &RuleConfig {
        match kind {
            RuleKind::AccountAge => &self.account_age,
            RuleKind::Karma => &self.karma,
        }
    }

    /// Whether the author name is on the exempt list.
    pub fn is_exempt(&self, author_name: &str) -> bool {
        self.exempt_users
            .iter()
            .any(|n| n.eq_ignore_ascii_case(author_name))
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            account_age: Self::default_account_age(),
            karma: Self::default_karma(),
            exempt_users: Self::default_exempt_users(),
        }
    }
}

/// Pass/fail outcome of comparing one rule's metric to its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleVerdict {
    pub rule: RuleKind,
    /// Computed age in days or karma. Signed: karma can go below zero.
    pub metric: i64,
    pub threshold: u32,
    pub passed: bool,
}

impl RuleVerdict {
    pub fn new(rule: RuleKind, metric: i64, threshold: u32) -> Self {
        Self {
            rule,
            metric,
            threshold,
            passed: metric >= i64::from(threshold),
        }
    }
}

/// A side effect the evaluator executed against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateAction {
    /// The content was removed.
    RemoveContent { content_id: String },
    /// The author was notified by private message.
    SendPrivateMessage {
        to: String,
        subject: String,
        text: String,
    },
    /// A distinguished removal comment was left on the content.
    SubmitComment { parent_id: String, text: String },
}
