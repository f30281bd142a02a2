use std::{
    io,
    path::Path,
    sync::mpsc::{self, Receiver, RecvError, SendError, Sender},
    thread::{self, JoinHandle},
};

use tracing::{debug, error, info};

use crate::config::WorkerConfig;
use crate::feature::{FsStore, RecordStore};
use crate::ids::RecordIds;
use crate::layer::{load_layer, Layer};
use crate::protocol::{Command, Coords, Event, QueryId};

/// The lifecycle of a worker: `Idle → Loading → Ready`.
///
/// A failed load goes back to `Idle`. `Ready` is final.
#[derive(Debug)]
pub enum WorkerState {
    Idle,
    /// [`Worker::handle`] runs a load to completion, so this state is only seen by callers when
    /// a load panicked and the panic was caught.
    Loading { name: String },
    Ready(Layer),
}

/// Opens the gazetteer at a directory.
pub type OpenFs = fn(&Path) -> FsStore;

fn open_fs(directory: &Path) -> FsStore {
    FsStore::new(directory)
}

/// A worker serving a single layer.
///
/// Every [`Command`] is answered by exactly one [`Event`].
pub struct Worker<F = OpenFs> {
    config: WorkerConfig,
    open: F,
    state: WorkerState,
}

impl Worker {
    /// A worker reading gazetteers from the filesystem.
    pub fn new(config: WorkerConfig) -> Self {
        Self::with_source(config, open_fs)
    }
}

impl<F, S> Worker<F>
where
    F: Fn(&Path) -> S,
    S: RecordIds + RecordStore,
{
    /// A worker reading records from the source `open` returns for the directory of a `load`.
    pub fn with_source(config: WorkerConfig, open: F) -> Self {
        Self {
            config,
            open,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn handle(&mut self, command: Command) -> Event {
        match command {
            Command::Load { name, directory } => self.load(name, &directory),
            Command::Search { id, coords } => self.search(id, coords),
        }
    }

    fn load(&mut self, name: String, directory: &Path) -> Event {
        match &self.state {
            WorkerState::Idle => {}
            WorkerState::Loading { name: loading } => {
                return Event::Error {
                    message: format!("cannot load layer {name}: layer {loading} is loading"),
                }
            }
            WorkerState::Ready(layer) => {
                return Event::Error {
                    message: format!("cannot load layer {name}: layer {} is loaded", layer.name()),
                }
            }
        }

        info!(layer = %name, directory = %directory.display(), "loading layer");
        self.state = WorkerState::Loading { name: name.clone() };
        let source = (self.open)(directory);
        match load_layer(&name, &source, &self.config) {
            Ok(layer) => {
                self.state = WorkerState::Ready(layer);
                Event::Loaded { name }
            }
            Err(err) => {
                error!(layer = %name, %err, "failed to load layer");
                self.state = WorkerState::Idle;
                Event::LoadFailed {
                    name,
                    error: err.to_string(),
                }
            }
        }
    }

    fn search(&self, id: QueryId, Coords { lat, lon }: Coords) -> Event {
        match &self.state {
            WorkerState::Ready(layer) => {
                let results = layer.search(lon, lat);
                debug!(%id, lon, lat, found = !results.is_empty(), "search");
                Event::Results {
                    name: layer.name().to_owned(),
                    id,
                    results,
                }
            }
            WorkerState::Loading { name } => Event::NotReady {
                name: Some(name.clone()),
                id,
            },
            WorkerState::Idle => Event::NotReady { name: None, id },
        }
    }
}

/// A [`Worker`] running on its own thread.
///
/// Commands are handled in the order they are sent, so a search sent right after a load is
/// answered once the layer is ready.
pub struct WorkerHandle {
    commands: Sender<Command>,
    events: Receiver<Event>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawns a worker reading gazetteers from the filesystem.
    pub fn spawn(config: WorkerConfig) -> io::Result<Self> {
        Self::spawn_worker(Worker::new(config))
    }

    pub fn spawn_worker<F, S>(mut worker: Worker<F>) -> io::Result<Self>
    where
        F: Fn(&Path) -> S + Send + 'static,
        S: RecordIds + RecordStore,
    {
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (event_tx, event_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("polyloc-worker".to_owned())
            .spawn(move || {
                for command in command_rx {
                    if event_tx.send(worker.handle(command)).is_err() {
                        break;
                    }
                }
                debug!("worker stopped");
            })?;

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            thread,
        })
    }

    pub fn send(&self, command: Command) -> Result<(), SendError<Command>> {
        self.commands.send(command)
    }

    /// Blocks until the next event.
    pub fn recv(&self) -> Result<Event, RecvError> {
        self.events.recv()
    }

    /// Stops accepting commands and waits for the pending ones to be handled.
    ///
    /// Returns the events that were not received yet.
    pub fn shutdown(self) -> thread::Result<Vec<Event>> {
        drop(self.commands);
        self.thread.join()?;
        Ok(self.events.try_iter().collect())
    }
}
