//! Mock generator for testing purposes.
//!
//! Replays scripted responses in order, recording prompts so tests can
//! assert on the retry instruction.
use std::sync::Mutex;

use super::SqlGenerator;
use crate::error::GenerationError;

/// A mock generator that replays canned responses.
pub struct MockGenerator {
    responses: Mutex<Vec<String>>,
    fail_with: Option<String>,
    calls: Mutex<usize>,
    last_user_prompt: Mutex<String>,
}

impl MockGenerator {
    /// Replay `responses` in order; once exhausted, further calls fail
    /// with a transport error.
    #[must_use]
    pub fn scripted(mut responses: Vec<String>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            fail_with: None,
            calls: Mutex::new(0),
            last_user_prompt: Mutex::new(String::new()),
        }
    }

    /// Always fail with a transport error.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
            calls: Mutex::new(0),
            last_user_prompt: Mutex::new(String::new()),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn last_user_prompt(&self) -> String {
        self.last_user_prompt.lock().unwrap().clone()
    }
}

impl SqlGenerator for MockGenerator {
    fn generate(&self, _system_prompt: &str, user_prompt: &str) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        *self.last_user_prompt.lock().unwrap() = user_prompt.to_string();

        if let Some(msg) = &self.fail_with {
            return Err(GenerationError::Http(msg.clone()));
        }

        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| GenerationError::Http("mock generator exhausted".to_string()))
    }
}
