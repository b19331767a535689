//! In-memory collaborators recording every call

use async_trait::async_trait;
use smsx_ops::models::{LinkStat, Subject, SubjectId};
use smsx_ops::services::{
    LinkPageQuery, LinkShortener, MessageSender, MessagingError, OutboundMessage, ShortenerError,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

pub fn subject(id: SubjectId) -> Subject {
    Subject {
        id,
        demographics: vec![],
    }
}

pub fn link(id: &str) -> LinkStat {
    LinkStat {
        id: id.to_string(),
        slashtag: format!("tag{}", id),
        short_url: format!("go.test.me/tag{}", id),
        clicks: id.len() as u64,
    }
}

/// `count` links, newest first, ids `L{count-1}` down to `L0`
pub fn links(count: usize) -> Vec<LinkStat> {
    (0..count).rev().map(|i| link(&format!("L{:04}", i))).collect()
}

enum ListBehavior {
    /// Serve pages out of a fixed newest-first inventory
    Inventory { links: Vec<LinkStat>, cap: u32 },
    /// Return these pages in order; `None` is a provider error
    Scripted(VecDeque<Option<Vec<LinkStat>>>),
}

/// Fake link-shortening service
pub struct FakeShortener {
    list: Mutex<ListBehavior>,
    failing_creates: HashSet<usize>,
    created: Mutex<Vec<String>>,
    queries: Mutex<Vec<LinkPageQuery>>,
}

impl FakeShortener {
    /// Provider capping pages at `cap` items regardless of requested limit
    pub fn with_inventory(links: Vec<LinkStat>, cap: u32) -> Self {
        Self::build(ListBehavior::Inventory { links, cap }, HashSet::new())
    }

    pub fn with_pages(pages: Vec<Option<Vec<LinkStat>>>) -> Self {
        Self::build(ListBehavior::Scripted(pages.into()), HashSet::new())
    }

    /// Create calls with these zero-based indices fail
    pub fn failing_creates(indices: &[usize]) -> Self {
        Self::build(
            ListBehavior::Scripted(VecDeque::new()),
            indices.iter().copied().collect(),
        )
    }

    fn build(list: ListBehavior, failing_creates: HashSet<usize>) -> Self {
        Self {
            list: Mutex::new(list),
            failing_creates,
            created: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Destinations passed to `create_link`, in call order
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    /// Queries passed to `list_links`, in call order
    pub fn queries(&self) -> Vec<LinkPageQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LinkShortener for FakeShortener {
    async fn create_link(&self, destination_url: &str) -> Result<String, ShortenerError> {
        let mut created = self.created.lock().unwrap();
        let index = created.len();
        created.push(destination_url.to_string());

        if self.failing_creates.contains(&index) {
            return Err(ShortenerError::ApiError(500, "boom".to_string()));
        }
        Ok(format!("go.test.me/s{}", index))
    }

    async fn list_links(&self, query: &LinkPageQuery) -> Result<Vec<LinkStat>, ShortenerError> {
        self.queries.lock().unwrap().push(query.clone());

        match &mut *self.list.lock().unwrap() {
            ListBehavior::Inventory { links, cap } => {
                let start = match &query.last {
                    None => 0,
                    Some(last) => match links.iter().position(|l| &l.id == last) {
                        Some(pos) => pos + 1,
                        None => return Err(ShortenerError::ApiError(400, "bad cursor".to_string())),
                    },
                };
                let take = query.limit.min(*cap) as usize;
                Ok(links.iter().skip(start).take(take).cloned().collect())
            }
            ListBehavior::Scripted(pages) => match pages.pop_front() {
                Some(Some(page)) => Ok(page),
                Some(None) => Err(ShortenerError::NetworkError("connection reset".to_string())),
                None => Ok(Vec::new()),
            },
        }
    }
}

/// Fake messaging service
pub struct FakeSender {
    rejected: HashSet<String>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl FakeSender {
    pub fn new() -> Self {
        Self::rejecting(&[])
    }

    /// Messages to these recipient addresses fail
    pub fn rejecting(recipients: &[&str]) -> Self {
        Self {
            rejected: recipients.iter().map(|r| r.to_string()).collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Every message submitted, including rejected ones
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send(&self, message: &OutboundMessage) -> Result<String, MessagingError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());

        if self.rejected.contains(&message.to) {
            return Err(MessagingError::Rejected(
                400,
                "The 'To' number is not a valid phone number.".to_string(),
            ));
        }
        Ok(format!("SM{:032}", sent.len()))
    }
}
