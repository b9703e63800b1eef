use crate::tui::{TuiActor, TuiMsg};
use crossterm::event::EventStream;
use futures::StreamExt;
use parley_actors::actor::Addr;
use parley_actors::system::ShutdownHandle;
use std::time::Duration;
use tokio::{sync::broadcast, time};

/// Start the terminal input reader and the redraw ticker.
pub fn spawn_tui_feeders(tui: Addr<TuiActor>, shutdown: ShutdownHandle) {
    tokio::spawn(forward_input(tui.clone(), shutdown.subscribe()));
    tokio::spawn(drive_ticks(tui, shutdown.subscribe()));
}

async fn forward_input(tui: Addr<TuiActor>, mut shutdown: broadcast::Receiver<()>) {
    let mut events = EventStream::new();
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            ev = events.next() => match ev {
                Some(Ok(ev)) => {
                    if tui.send(TuiMsg::InputEvent(ev)).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    let _ = tui.send(TuiMsg::OpError(format!("input: {e}"))).await;
                }
                None => break,
            }
        }
    }
}

async fn drive_ticks(tui: Addr<TuiActor>, mut shutdown: broadcast::Receiver<()>) {
    let mut interval = time::interval(Duration::from_millis(80));
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                // A full mailbox already has a redraw coming.
                let _ = tui.try_send(TuiMsg::Tick);
            }
        }
    }
}
