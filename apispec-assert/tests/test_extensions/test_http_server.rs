//! A HttpServer for test that can be configured using warp filters.

// Base code from the httpserver in reqwest tests:
// https://github.com/seanmonstar/reqwest/blob/master/tests/support/server.rs

use std::future::Future;
use std::{net::SocketAddr, sync::mpsc as std_mpsc, thread, time::Duration};

use tokio::runtime::Runtime;
use tokio::{runtime, sync::oneshot};
use warp::{Filter, Reply};

/// A HTTP server for test
pub struct TestHttpServer {
    address: SocketAddr,
    panic_rx: std_mpsc::Receiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestHttpServer {
    /// Get the test server address
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Get the server url
    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Get the url of a route of the server
    pub fn route_url(&self, route: &str) -> reqwest::Url {
        reqwest::Url::parse(&format!("{}/{}", self.url(), route.trim_start_matches('/')))
            .expect("test server route should be a valid url")
    }
}

impl Drop for TestHttpServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if !::std::thread::panicking() {
            self.panic_rx
                .recv_timeout(Duration::from_secs(3))
                .expect("test server should not panic");
        }
    }
}

/// Spawn a [TestHttpServer] on a random local port using the given warp filters
pub fn test_http_server<F>(filters: F) -> TestHttpServer
where
    F: Filter + Clone + Send + Sync + 'static,
    F::Extract: Reply,
{
    let socket_addr: SocketAddr = ([127, 0, 0, 1], 0).into();

    // Spawn new runtime in thread to prevent reactor execution context conflict
    thread::spawn(move || {
        let rt = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("new rt");
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (panic_tx, panic_rx) = std_mpsc::channel();

        let (address, server) = rt.block_on(async move {
            warp::serve(filters).bind_with_graceful_shutdown(socket_addr, async {
                shutdown_rx.await.ok();
            })
        });
        spawn_server_thread(rt, panic_tx, server);

        TestHttpServer {
            address,
            panic_rx,
            shutdown_tx: Some(shutdown_tx),
        }
    })
    .join()
    .unwrap()
}

fn spawn_server_thread<F>(rt: Runtime, panic_tx: std_mpsc::Sender<()>, server_future: F)
where
    F: Future + Send + 'static,
{
    let thread_name = format!(
        "test({})-support-server",
        thread::current().name().unwrap_or("<unknown>")
    );

    thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            rt.block_on(server_future);
            let _ = panic_tx.send(());
        })
        .expect("thread spawn");
}
