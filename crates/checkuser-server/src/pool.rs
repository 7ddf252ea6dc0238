//! Fixed-size worker pool draining a bounded connection queue.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing;

use checkuser_core::AppResult;
use checkuser_core::error::AppError;

use crate::handler::ConnectionHandler;

/// An accepted connection waiting for a worker.
#[derive(Debug)]
pub struct PendingConnection {
    /// Client stream
    pub stream: TcpStream,
    /// Client address
    pub peer: SocketAddr,
    /// When the accept loop received it
    pub accepted_at: Instant,
}

/// N workers sharing one FIFO queue.
///
/// Every worker competes for the receiver, so each connection is served
/// by exactly one worker in arrival order.
#[derive(Debug)]
pub struct WorkerPool {
    /// Producer side of the queue
    sender: mpsc::Sender<PendingConnection>,
    /// Running workers
    workers: JoinSet<()>,
    /// Number of workers started
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers behind a queue holding `capacity` connections.
    pub fn start(size: usize, capacity: usize, handler: Arc<ConnectionHandler>) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = JoinSet::new();
        for worker_id in 0..size {
            workers.spawn(worker_loop(
                worker_id,
                Arc::clone(&receiver),
                Arc::clone(&handler),
            ));
        }

        tracing::info!("Started {} request workers (queue capacity {})", size, capacity);

        Self {
            sender,
            workers,
            size,
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections waiting for a worker.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Enqueue a connection, waiting while the queue is full.
    pub async fn submit(&self, connection: PendingConnection) -> AppResult<()> {
        self.sender
            .send(connection)
            .await
            .map_err(|_| AppError::internal("Worker pool is closed"))
    }

    /// Stop accepting work and wait up to `grace` for queued and in-flight
    /// connections; whatever remains after that is aborted.
    pub async fn shutdown(self, grace: Duration) {
        let Self {
            sender,
            mut workers,
            ..
        } = self;
        drop(sender);

        let drained = tokio::time::timeout(grace, async {
            while workers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                "Aborting {} workers still busy after {:?}",
                workers.len(),
                grace
            );
            workers.abort_all();
            while workers.join_next().await.is_some() {}
        }

        tracing::info!("Worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<PendingConnection>>>,
    handler: Arc<ConnectionHandler>,
) {
    tracing::debug!("Worker {} started", worker_id);
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        match next {
            Some(connection) => handler.handle(connection).await,
            None => break,
        }
    }
    tracing::debug!("Worker {} stopped", worker_id);
}
