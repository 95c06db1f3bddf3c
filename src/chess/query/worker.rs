use super::{QueryExecutor, QueryResponse, SearchRequest};
use crate::chess::error::QueryError;

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Deserialize;
use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Inbound messages of the worker, processed strictly in order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    Search(SearchRequest),
    Invalidate { path: PathBuf },
    InvalidateAll,
}

/// A search executor running on its own thread.
///
/// Requests are answered in submission order with exactly one
/// [`QueryResponse`] each. Cache invalidations are ordered with searches, so
/// a search submitted after an invalidation sees fresh data.
pub struct QueryWorker {
    commands: Option<Sender<Command>>,
    completions: Receiver<QueryResponse>,
    thread: Option<JoinHandle<()>>,
}

impl QueryWorker {
    pub fn spawn(mut executor: QueryExecutor) -> io::Result<Self> {
        let (command_tx, command_rx) = unbounded::<Command>();
        let (completion_tx, completion_rx) = unbounded::<QueryResponse>();

        let thread = thread::Builder::new()
            .name("query-worker".to_string())
            .spawn(move || {
                for command in command_rx {
                    match command {
                        Command::Search(request) => {
                            let request_id = request.request_id;
                            let response = executor.execute(request);
                            if completion_tx.send(response).is_err() {
                                debug!("Dropping response {}: no receiver", request_id);
                                break;
                            }
                        }
                        Command::Invalidate { path } => executor.invalidate(&path),
                        Command::InvalidateAll => executor.invalidate_all(),
                    }
                }
                debug!("Query worker stopped");
            })?;

        Ok(Self {
            commands: Some(command_tx),
            completions: completion_rx,
            thread: Some(thread),
        })
    }

    pub fn send(&self, command: Command) -> Result<(), QueryError> {
        self.commands
            .as_ref()
            .ok_or(QueryError::Disconnected)?
            .send(command)
            .map_err(|_| QueryError::Disconnected)
    }

    pub fn submit(&self, request: SearchRequest) -> Result<(), QueryError> {
        self.send(Command::Search(request))
    }

    pub fn invalidate(&self, path: impl Into<PathBuf>) -> Result<(), QueryError> {
        self.send(Command::Invalidate { path: path.into() })
    }

    pub fn invalidate_all(&self) -> Result<(), QueryError> {
        self.send(Command::InvalidateAll)
    }

    /// Completion stream. Cloneable, so callers may select on it.
    pub fn completions(&self) -> &Receiver<QueryResponse> {
        &self.completions
    }

    /// Block for the next completion.
    pub fn recv(&self) -> Result<QueryResponse, QueryError> {
        self.completions.recv().map_err(|_| QueryError::Disconnected)
    }
}

impl Drop for QueryWorker {
    fn drop(&mut self) {
        // Closing the command channel ends the worker loop.
        self.commands.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            error!("Query worker thread panicked");
        }
    }
}
