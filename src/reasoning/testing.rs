use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{ReasoningTransport, TransportError};
use crate::credentials::Credential;

type Reply = Result<String, TransportError>;

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    fallback: Option<Reply>,
    calls: Vec<(String, String, Instant)>,
}

/// Transport that plays back canned replies and records every call.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> ScriptedTransport {
        let script = Script {
            replies: replies.into_iter().collect(),
            ..Script::default()
        };
        ScriptedTransport {
            script: Arc::new(Mutex::new(script)),
        }
    }

    /// answers every call with `reply`
    pub(crate) fn always(reply: Reply) -> ScriptedTransport {
        let transport = ScriptedTransport::new([]);
        transport.script.lock().unwrap().fallback = Some(reply);
        transport
    }

    pub(crate) fn attempts(&self) -> usize {
        self.script.lock().unwrap().calls.len()
    }

    pub(crate) fn credentials(&self) -> Vec<String> {
        let script = self.script.lock().unwrap();
        script.calls.iter().map(|(k, _, _)| k.clone()).collect()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        let script = self.script.lock().unwrap();
        script.calls.iter().map(|(_, p, _)| p.clone()).collect()
    }

    pub(crate) fn dispatch_times(&self) -> Vec<Instant> {
        let script = self.script.lock().unwrap();
        script.calls.iter().map(|(_, _, at)| *at).collect()
    }
}

#[async_trait]
impl ReasoningTransport for ScriptedTransport {
    async fn generate(&self, credential: &Credential, prompt: &str) -> Result<String, TransportError> {
        let mut script = self.script.lock().unwrap();
        script
            .calls
            .push((credential.secret().to_string(), prompt.to_string(), Instant::now()));
        match script.replies.pop_front() {
            Some(reply) => reply,
            None => script
                .fallback
                .clone()
                .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into()))),
        }
    }
}
