use crate::actor::{Actor, Context};
use anyhow::Result;
use parley_chat::{ChatOutcome, PendingSend, request_reply};
use parley_llm::traits::LlmClient;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

/// One dispatched prompt and where to deliver its outcome.
pub struct ChatCmd {
    pub pending: PendingSend,
    pub reply: oneshot::Sender<(PendingSend, ChatOutcome)>,
}

/// Runs remote model calls off the UI task.
pub struct ChatActor {
    llm_client: Arc<dyn LlmClient + Send + Sync>,
}

impl ChatActor {
    pub fn new(llm_client: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self { llm_client }
    }
}

#[async_trait::async_trait]
impl Actor for ChatActor {
    type Msg = ChatCmd;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        let ChatCmd { pending, reply } = msg;

        let started = Instant::now();
        let outcome = request_reply(self.llm_client.as_ref(), pending.prompt()).await;
        tracing::info!(
            model = self.llm_client.model_name(),
            ok = outcome.is_success(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "chat.call_finished"
        );

        if reply.send((pending, outcome)).is_err() {
            tracing::warn!("chat.reply_dropped");
        }
        Ok(())
    }
}
