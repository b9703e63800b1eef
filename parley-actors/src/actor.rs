//! Actors own their state and process one message at a time from a bounded
//! mailbox.
//!
//! ```
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use parley_actors::actor::{self, Actor, Context};
//!
//! /// Collects transcript lines until told to flush.
//! struct Scribe {
//!     lines: Vec<String>,
//! }
//!
//! enum ScribeMsg {
//!     Line(String),
//!     Flush(tokio::sync::oneshot::Sender<Vec<String>>),
//! }
//!
//! #[async_trait]
//! impl Actor for Scribe {
//!     type Msg = ScribeMsg;
//!
//!     async fn handle(&mut self, msg: ScribeMsg, ctx: &mut Context<Self>) -> Result<()> {
//!         match msg {
//!             ScribeMsg::Line(line) => self.lines.push(line),
//!             ScribeMsg::Flush(reply) => {
//!                 let _ = reply.send(std::mem::take(&mut self.lines));
//!                 ctx.stop();
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let reserved = actor::spawn_actor_reserved::<Scribe>("scribe", 4);
//! let scribe = reserved.addr();
//! scribe.try_send(ScribeMsg::Line("hello".into())).ok();
//!
//! let handle = reserved.start(Scribe { lines: Vec::new() });
//! let (tx, rx) = tokio::sync::oneshot::channel();
//! scribe.send(ScribeMsg::Line("Hi there!".into())).await.ok();
//! scribe.send(ScribeMsg::Flush(tx)).await.ok();
//!
//! assert_eq!(rx.await.unwrap(), ["hello", "Hi there!"]);
//! handle.task.await.unwrap().unwrap();
//! # });
//! ```

use anyhow::Result;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

/// Mailbox-driven unit of state. `Self: Sized` keeps `Context<Self>` usable.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle one message. Returning `Err` stops the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Per-actor runtime context handed to [`Actor::handle`].
pub struct Context<A: Actor> {
    addr: Addr<A>,
    stop: bool,
}

impl<A: Actor> Context<A> {
    /// Address of the running actor, for replies routed back to itself.
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Stop after the current message.
    pub fn stop(&mut self) {
        self.stop = true;
    }

    pub fn is_stopping(&self) -> bool {
        self.stop
    }
}

/// Sending half of an actor's bounded mailbox.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

// Manual impl so `A` itself need not be `Clone`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Send, waiting for mailbox space. Gives the message back if the actor is gone.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Send without waiting. Gives the message back if the mailbox is full or closed.
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.0.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<Result<()>>,
}

/// Spawn an actor with a bounded mailbox of `capacity` messages.
///
/// The actor stops when `handle` returns `Err` or when it calls
/// [`Context::stop`]. The context holds an `Addr` of its own, so dropping
/// outside addresses alone does not end it.
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

/// Like [`spawn_actor`], additionally stopping on a shutdown broadcast.
pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    spawn_actor_reserved("anon", capacity).start_with_shutdown(actor, shutdown)
}

/// A mailbox whose actor has not been started yet.
///
/// Reserving first lets actors that reference each other be constructed
/// with each other's addresses before any of them runs.
pub struct Reserved<A: Actor> {
    name: String,
    addr: Addr<A>,
    rx: mpsc::Receiver<A::Msg>,
}

impl<A: Actor> Reserved<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Start the actor on the reserved mailbox. Messages queued while
    /// reserved are handled first.
    pub fn start(self, actor: A) -> ActorHandle<A> {
        self.start_with_shutdown(actor, None)
    }

    pub fn start_with_shutdown(
        self,
        actor: A,
        shutdown: Option<broadcast::Receiver<()>>,
    ) -> ActorHandle<A> {
        let Reserved { name, addr, rx } = self;
        let ctx = Context {
            addr: addr.clone(),
            stop: false,
        };
        let task = tokio::spawn(run_mailbox(name, actor, ctx, rx, shutdown));
        ActorHandle { addr, task }
    }
}

/// Create a named mailbox without starting its actor.
pub fn spawn_actor_reserved<A: Actor>(name: impl Into<String>, capacity: usize) -> Reserved<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity);
    Reserved {
        name: name.into(),
        addr: Addr(tx),
        rx,
    }
}

async fn run_mailbox<A: Actor>(
    name: String,
    mut actor: A,
    mut ctx: Context<A>,
    mut rx: mpsc::Receiver<A::Msg>,
    mut shutdown: Option<broadcast::Receiver<()>>,
) -> Result<()> {
    loop {
        let msg = match shutdown.as_mut() {
            Some(shutdown_rx) => tokio::select! {
                _ = shutdown_rx.recv() => break,
                msg = rx.recv() => msg,
            },
            None => rx.recv().await,
        };
        let Some(msg) = msg else { break };

        if let Err(e) = actor.handle(msg, &mut ctx).await {
            tracing::error!(target: "parley-actors", actor = %name, error = ?e, "actor returned error; stopping");
            return Err(e);
        }
        if ctx.stop {
            break;
        }
    }
    tracing::debug!(target: "parley-actors", actor = %name, "actor stopped");
    Ok(())
}
