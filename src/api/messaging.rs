//! Purpose: Publish messages to a universe topic.
//! Exports: `MessagingService`, `MAX_TOPIC_LEN`.
//! Role: Thin request builder over the dispatcher.
//! Invariants: Topics are 1..=80 ASCII alphanumeric characters, checked locally.
use super::Universe;
use crate::core::dispatch::{Outcome, RequestDescriptor};
use crate::core::error::{ApiResult, Error};
use crate::core::transport::Method;
use serde_json::json;

pub const MAX_TOPIC_LEN: usize = 80;

#[derive(Clone)]
pub struct MessagingService<'u> {
    universe: &'u Universe,
}

impl<'u> MessagingService<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self { universe }
    }

    pub fn publish(&self, topic: &str, message: &str) -> ApiResult<Outcome> {
        validate_topic(topic)?;
        let id = self.universe.id().to_string();
        let url = self.universe.endpoint(&[
            "messaging-service",
            "v1",
            "universes",
            &id,
            "topics",
            topic,
        ])?;
        let request =
            RequestDescriptor::new(Method::Post, url).with_json(json!({ "message": message }));
        self.universe.execute(&request)
    }
}

fn validate_topic(topic: &str) -> ApiResult<()> {
    if topic.is_empty() || topic.len() > MAX_TOPIC_LEN {
        return Err(Error::validation(format!(
            "topic must be 1 to {MAX_TOPIC_LEN} characters"
        )));
    }
    if !topic.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
        return Err(Error::validation("topic must be alphanumeric characters only"));
    }
    Ok(())
}
