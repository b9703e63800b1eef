use crate::actor::{Actor, Addr, Reserved, spawn_actor_reserved};
use crate::system::{ActorSystem, ShutdownHandle};
use anyhow::Result;
use std::any::Any;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Wires actors together: reserve mailboxes, start actors, publish their
/// addresses by name, then block until shutdown.
pub struct Builder {
    sys: ActorSystem,
    addrs: HashMap<String, Box<dyn Any + Send + Sync>>,
    // Subscribed up front so a signal sent before `run_until_shutdown` is not lost.
    shutdown_rx: broadcast::Receiver<()>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        let sys = ActorSystem::new();
        let shutdown_rx = sys.subscribe();
        Self {
            sys,
            addrs: HashMap::new(),
            shutdown_rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.sys.shutdown_handle()
    }

    /// Reserve a mailbox and publish its `Addr` under `name` right away.
    pub fn reserve<A: Actor>(&mut self, name: &str, mailbox: usize) -> Reserved<A> {
        let r = spawn_actor_reserved::<A>(name, mailbox);
        self.addrs.insert(name.to_string(), Box::new(r.addr()));
        r
    }

    /// Start a reserved actor under the shared shutdown signal and track its task.
    pub fn start_reserved<A: Actor>(&mut self, r: Reserved<A>, actor: A) -> &mut Self {
        let h = r.start_with_shutdown(actor, Some(self.sys.subscribe()));
        self.sys.track(async move { h.task.await? });
        self
    }

    /// Reserve and start in one call.
    pub fn spawn<A: Actor>(&mut self, name: &str, mailbox: usize, actor: A) -> Addr<A> {
        let r = self.reserve::<A>(name, mailbox);
        let addr = r.addr();
        self.start_reserved(r, actor);
        addr
    }

    /// Typed address lookup; `None` if the name is unknown or the type differs.
    pub fn addr<A: Actor>(&self, name: &str) -> Option<Addr<A>> {
        self.addrs
            .get(name)
            .and_then(|b| b.downcast_ref::<Addr<A>>().cloned())
    }

    /// Wait for Ctrl-C or a shutdown signal, then stop every actor.
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(target: "parley-actors", "ctrl-c received");
            }
            _ = self.shutdown_rx.recv() => {}
        }
        // Published addresses keep mailboxes open; drop them first.
        self.addrs.clear();
        self.sys.graceful_shutdown().await
    }
}
