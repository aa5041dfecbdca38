// Submission poller - stands in for a hosted trigger feed.
//
// Reddit does not push submission events to a script app, so the bot polls
// the subreddit's /new and /comments listings on an interval and synthesizes
// a trigger event for every fullname it has not seen before.

use crate::bot::triggers;
use crate::core::moderation::{
    AccountGateService, AuthorRef, ContentKind, ContentRef, EventKind, GateError, SettingsStore,
    SubredditRef, TriggerEvent,
};
use crate::infra::reddit::{RedditApiClient, SubmissionRecord};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::sleep;

/// How the poller watches the subreddit.
pub struct PollerConfig {
    pub subreddit: String,
    pub interval: Duration,
    /// Listing page size per poll.
    pub page_size: u32,
}

/// Background loop that feeds fresh submissions to the gate.
pub struct SubmissionPoller<S: SettingsStore> {
    client: RedditApiClient,
    service: AccountGateService<RedditApiClient, S>,
    config: PollerConfig,
    seen: SeenSet,
}

impl<S: SettingsStore> SubmissionPoller<S> {
    pub fn new(
        client: RedditApiClient,
        service: AccountGateService<RedditApiClient, S>,
        config: PollerConfig,
    ) -> Self {
        Self {
            client,
            service,
            config,
            // Two full pages of posts plus comments fit comfortably.
            seen: SeenSet::new(4096),
        }
    }

    /// Run forever. Poll failures are logged and the loop keeps going.
    pub async fn run(mut self) {
        // Prime the seen set so a restart does not re-moderate content
        // that was already up when the bot came back.
        match self.fetch_latest().await {
            Ok(records) => {
                for record in records {
                    self.seen.insert(record.fullname);
                }
            }
            Err(e) => tracing::warn!(error = %e, "Initial listing sweep failed"),
        }

        loop {
            sleep(self.config.interval).await;

            let records = match self.fetch_latest().await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, "Submission poll failed");
                    continue;
                }
            };

            for record in records {
                if !self.seen.insert(record.fullname.clone()) {
                    continue;
                }

                tracing::debug!(
                    fullname = %record.fullname,
                    kind = %record.kind,
                    "New submission"
                );
                let event = trigger_event_for(&record);
                triggers::handle_event(&self.service, &event).await;
            }
        }
    }

    async fn fetch_latest(&self) -> Result<Vec<SubmissionRecord>, GateError> {
        let mut records = self
            .client
            .latest_posts(&self.config.subreddit, self.config.page_size)
            .await?;
        records.extend(
            self.client
                .latest_comments(&self.config.subreddit, self.config.page_size)
                .await?,
        );
        Ok(records)
    }
}

/// Synthesize the trigger event for a listed submission.
///
/// An author ref is only attached when the listing carried both the author
/// fullname and name; the gate treats events without one as malformed and
/// skips them.
fn trigger_event_for(record: &SubmissionRecord) -> TriggerEvent {
    let content = Some(ContentRef {
        id: record.fullname.clone(),
    });
    let (kind, post, comment) = match record.kind {
        ContentKind::Post => (EventKind::PostSubmit, content, None),
        ContentKind::Comment => (EventKind::CommentSubmit, None, content),
    };

    let author = match (&record.author_id, &record.author_name) {
        (Some(id), Some(name)) => Some(AuthorRef {
            id: id.clone(),
            name: name.clone(),
        }),
        _ => None,
    };

    TriggerEvent {
        kind,
        post,
        comment,
        author,
        subreddit: SubredditRef {
            name: record.subreddit.clone(),
        },
    }
}

/// Insertion-ordered set of content fullnames with a size cap.
///
/// Old entries fall out first; the cap only needs to outlast the listing
/// window so a fullname cannot be reported as new twice.
struct SeenSet {
    set: HashSet<String>,
    order: VecDeque<String>,
    cap: usize,
}

impl SeenSet {
    fn new(cap: usize) -> Self {
        Self {
            set: HashSet::new(),
            order: VecDeque::new(),
            cap,
        }
    }

    /// Insert an id. Returns `false` if it was already present.
    fn insert(&mut self, id: String) -> bool {
        if !self.set.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.cap {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seen_set_dedupes() {
        let mut seen = SeenSet::new(8);

        assert!(seen.insert("t3_a".to_string()));
        assert!(!seen.insert("t3_a".to_string()));
        assert!(seen.insert("t3_b".to_string()));
    }

    #[test]
    fn test_seen_set_evicts_oldest() {
        let mut seen = SeenSet::new(2);
        seen.insert("t3_a".to_string());
        seen.insert("t3_b".to_string());
        seen.insert("t3_c".to_string()); // evicts t3_a

        assert!(seen.insert("t3_a".to_string()));
        assert!(!seen.insert("t3_c".to_string()));
    }

    #[test]
    fn test_post_record_becomes_post_submit_event() {
        let record = SubmissionRecord {
            kind: ContentKind::Post,
            fullname: "t3_abc".to_string(),
            author_id: Some("t2_user".to_string()),
            author_name: Some("newuser".to_string()),
            subreddit: "rustlang".to_string(),
        };

        let event = trigger_event_for(&record);

        assert_eq!(event.kind, EventKind::PostSubmit);
        assert_eq!(event.content_kind(), Some(ContentKind::Post));
        assert_eq!(event.content_id(), Some("t3_abc"));
        assert_eq!(event.author.as_ref().unwrap().name, "newuser");
        assert_eq!(event.subreddit.name, "rustlang");
    }

    #[test]
    fn test_deleted_author_maps_to_missing_author() {
        let record = SubmissionRecord {
            kind: ContentKind::Comment,
            fullname: "t1_def".to_string(),
            author_id: None,
            author_name: Some("[deleted]".to_string()),
            subreddit: "rustlang".to_string(),
        };

        let event = trigger_event_for(&record);

        assert_eq!(event.kind, EventKind::CommentSubmit);
        assert_eq!(event.content_id(), Some("t1_def"));
        assert!(event.author.is_none());
    }
}
