use crate::{
    state::{Action, UiState},
    view,
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    event::Event as CtEvent,
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use parley_actors::{
    ChatCmd, ChatActor, SpeechActor,
    actor::{Actor, Addr, Context},
    system::ShutdownHandle,
};
use parley_chat::{ChatOutcome, PendingSend, Session};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};
use tokio::sync::oneshot;

pub enum TuiMsg {
    InputEvent(CtEvent),
    Tick,
    ChatDone(PendingSend, ChatOutcome),
    OpError(String),
    Shutdown,
}

/// Owns the terminal and the chat session; every session transition runs
/// inside `handle`, one message at a time.
pub struct TuiActor {
    state: UiState,

    chat: Addr<ChatActor>,
    speech: Addr<SpeechActor>,

    term: Terminal<CrosstermBackend<Stdout>>,
    tick_rate: Duration,
    last_draw: Instant,
    restored: bool,

    shutdown: ShutdownHandle,
}

impl TuiActor {
    pub fn new(
        session: Session,
        title: impl Into<String>,
        chat: Addr<ChatActor>,
        speech: Addr<SpeechActor>,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut term = Terminal::new(backend)?;
        term.clear()?;

        Ok(Self {
            state: UiState::new(session, title),
            chat,
            speech,
            term,
            tick_rate: Duration::from_millis(250),
            last_draw: Instant::now(),
            restored: false,
            shutdown,
        })
    }

    fn draw(&mut self) -> Result<()> {
        view::draw(&mut self.term, &self.state.snapshot())?;
        self.last_draw = Instant::now();
        Ok(())
    }

    fn dispatch(&mut self, pending: PendingSend, me: Addr<TuiActor>) {
        tracing::debug!(prompt_len = pending.prompt().len(), "tui.dispatch");
        let (tx, rx) = oneshot::channel();
        let sent = pending.clone();
        if let Err(cmd) = self.chat.try_send(ChatCmd { pending, reply: tx }) {
            // Never leave the session stuck busy.
            self.state.complete(
                cmd.pending,
                ChatOutcome::Failure {
                    reason: "chat worker unavailable".into(),
                },
            );
            return;
        }
        tokio::spawn(async move {
            let (pending, outcome) = await_reply(sent, rx).await;
            let _ = me.send(TuiMsg::ChatDone(pending, outcome)).await;
        });
    }

    fn restore_terminal(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        disable_raw_mode().ok();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        self.term.show_cursor().ok();
    }
}

/// Wait for the chat worker's answer. A dropped reply channel still
/// completes `sent`, as a failure, so the session leaves busy.
async fn await_reply(
    sent: PendingSend,
    rx: oneshot::Receiver<(PendingSend, ChatOutcome)>,
) -> (PendingSend, ChatOutcome) {
    match rx.await {
        Ok(done) => done,
        Err(e) => {
            tracing::error!(error = %e, "tui.chat_reply_lost");
            (
                sent,
                ChatOutcome::Failure {
                    reason: format!("chat worker stopped: {e}"),
                },
            )
        }
    }
}

impl Drop for TuiActor {
    fn drop(&mut self) {
        self.restore_terminal();
    }
}

#[async_trait]
impl Actor for TuiActor {
    type Msg = TuiMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            TuiMsg::InputEvent(CtEvent::Key(key)) => match self.state.handle_key(key) {
                Some(Action::Dispatch(pending)) => self.dispatch(pending, ctx.addr()),
                Some(Action::Quit) => {
                    let _ = ctx.addr().try_send(TuiMsg::Shutdown);
                }
                None => {}
            },
            TuiMsg::InputEvent(CtEvent::Resize(..)) => self.state.mark_dirty(),
            TuiMsg::InputEvent(_) => {}
            TuiMsg::ChatDone(pending, outcome) => {
                if let Some(request) = self.state.complete(pending, outcome)
                    && self.speech.try_send(request).is_err()
                {
                    tracing::warn!("tui.speech_dropped");
                }
            }
            TuiMsg::OpError(e) => {
                tracing::error!(error = %e, "tui.op_error");
                self.state.report_error(e);
            }
            TuiMsg::Tick => {
                self.state.step_spinner();
                if self.state.take_dirty() || self.last_draw.elapsed() >= self.tick_rate {
                    self.draw()?;
                }
            }
            TuiMsg::Shutdown => {
                self.restore_terminal();
                self.shutdown.signal();
                ctx.stop();
            }
        }

        Ok(())
    }
}
