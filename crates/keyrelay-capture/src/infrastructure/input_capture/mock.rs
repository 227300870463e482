//! Scripted input source for tests and demos.
//!
//! Replays a fixed list of [`InputEvent`]s, optionally followed by an error,
//! without touching `/dev/input`.

use std::collections::VecDeque;

use async_trait::async_trait;
use keyrelay_core::InputEvent;

use super::{InputSource, SourceError};

/// An [`InputSource`] that yields a predefined sequence of events.
#[derive(Debug, Default)]
pub struct ScriptedInputSource {
    events: VecDeque<InputEvent>,
    trailing_error: Option<SourceError>,
}

impl ScriptedInputSource {
    /// Creates a source that yields `events` in order and then ends.
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            trailing_error: None,
        }
    }

    /// Makes the source fail with `error` after the scripted events.
    pub fn then_fail(mut self, error: SourceError) -> Self {
        self.trailing_error = Some(error);
        self
    }
}

#[async_trait]
impl InputSource for ScriptedInputSource {
    async fn next_event(&mut self) -> Result<Option<InputEvent>, SourceError> {
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            None => match self.trailing_error.take() {
                Some(error) => Err(error),
                None => Ok(None),
            },
        }
    }
}
