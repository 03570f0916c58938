use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use futures::StreamExt;
use tokio::sync::mpsc;

/// The renderer's own cadence; sampling cadences live in the samplers.
pub const RENDER_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
pub enum Event {
    Key(KeyEvent),
    Render,
    Resize,
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    pub fn new(render_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();

        let task = tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            let mut render_interval = tokio::time::interval(render_rate);

            loop {
                tokio::select! {
                    maybe_event = reader.next() => {
                        match maybe_event {
                            Some(Ok(evt)) => {
                                let mapped = match evt {
                                    CrosstermEvent::Key(key) => Some(Event::Key(key)),
                                    CrosstermEvent::Resize(_, _) => Some(Event::Resize),
                                    _ => None,
                                };
                                if let Some(e) = mapped
                                    && tx.send(e).is_err()
                                {
                                    break;
                                }
                            }
                            Some(Err(_)) => break,
                            None => break,
                        }
                    }
                    _ = render_interval.tick() => {
                        if tx.send(Event::Render).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { rx, _task: task }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
