//! Accept loop and worker lifecycle
//!
//! The server binds a non-blocking listener and polls it until the shared
//! termination flag is raised, spawning one OS thread per accepted
//! connection. Each worker owns its stream; the server keeps a clone only
//! so it can shut the socket down during teardown.
//!
//! Shutdown is cooperative: raise every worker's flag, join them (their
//! receive timeout bounds the wait), then shut the sockets for read and
//! write. Persistence happens after this function returns, once no worker
//! can touch the stores.

use crate::core::Engine;
use crate::net::dispatcher::Dispatcher;
use crate::types::ServerError;
use std::net::{Ipv4Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on; 0 lets the OS pick one
    pub port: u16,

    /// Socket receive timeout; bounds shutdown latency for idle workers
    pub recv_timeout: Duration,
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    stream: TcpStream,
}

/// A bound, not yet serving, listener
pub struct Server {
    listener: TcpListener,
    recv_timeout: Duration,
}

impl Server {
    /// Bind the listening socket
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port))
            .map_err(|error| ServerError::bind(config.port, error))?;
        listener
            .set_nonblocking(true)
            .map_err(|error| ServerError::bind(config.port, error))?;
        Ok(Server {
            listener,
            recv_timeout: config.recv_timeout,
        })
    }

    /// The address the listener actually bound
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until the termination flag is raised
    pub fn serve(self, engine: Arc<Engine>, terminate: Arc<AtomicBool>) -> Result<(), ServerError> {
        info!(addr = %self.local_addr()?, "listening for connections");
        let mut workers: Vec<Worker> = Vec::new();

        while !terminate.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!(%peer, "accepted connection");
                    match spawn_worker(stream, peer, engine.clone(), self.recv_timeout) {
                        Ok(worker) => workers.push(worker),
                        Err(error) => warn!(%peer, %error, "failed to start worker"),
                    }
                }
                Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                    reap_finished(&mut workers);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(error) => warn!(%error, "failed to accept connection"),
            }
        }

        info!(workers = workers.len(), "shutting down");
        for worker in &workers {
            worker.stop.store(true, Ordering::Relaxed);
        }
        for worker in workers {
            if worker.handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
            let _ = worker.stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }
}

fn spawn_worker(
    stream: TcpStream,
    peer: SocketAddr,
    engine: Arc<Engine>,
    recv_timeout: Duration,
) -> Result<Worker, ServerError> {
    stream.set_read_timeout(Some(recv_timeout))?;
    let monitor = stream.try_clone()?;
    let stop = Arc::new(AtomicBool::new(false));

    let dispatcher = Dispatcher::new(stream, peer, engine, stop.clone());
    let handle = thread::Builder::new()
        .name(format!("cnp-client-{peer}"))
        .spawn(move || dispatcher.run())
        .map_err(ServerError::from)?;

    Ok(Worker {
        stop,
        handle,
        stream: monitor,
    })
}

/// Join workers whose connections already ended, keeping the list short
fn reap_finished(workers: &mut Vec<Worker>) {
    let mut index = 0;
    while index < workers.len() {
        if workers[index].handle.is_finished() {
            let worker = workers.remove(index);
            let _ = worker.handle.join();
        } else {
            index += 1;
        }
    }
}
