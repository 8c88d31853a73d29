use std::sync::Arc;
use std::thread::JoinHandle;
use tokenwarden::server::serve_with_shutdown;
use tokenwarden::{DomainManager, TokenServerConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A token server running on its own runtime thread, stopped on drop.
pub struct TestServer {
    pub url: String,
    pub manager: Arc<DomainManager>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start() -> Self {
        Self::start_with(TokenServerConfig::default())
    }

    pub fn start_with(config: TokenServerConfig) -> Self {
        // Bound before the runtime starts so clients can connect immediately.
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        std_listener.set_nonblocking(true).unwrap();
        let addr = std_listener.local_addr().unwrap();

        let manager = Arc::new(DomainManager::new(config).unwrap());
        let server_manager = manager.clone();
        let (tx, rx) = oneshot::channel::<()>();

        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = TcpListener::from_std(std_listener).unwrap();
                serve_with_shutdown(listener, server_manager, async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
            });
        });

        Self {
            url: format!("http://{addr}"),
            manager,
            shutdown: Some(tx),
            thread: Some(thread),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
