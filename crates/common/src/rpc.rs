//! RPC server and client call over TCP
//!
//! A server is a table of named handlers behind an accept loop. Each accepted
//! connection runs on its own task and may carry any number of request frames;
//! callers in this system send exactly one and hang up. A response that does
//! not fit in one frame is replaced by a call-level `result too large` error.

use crate::error::{PoolError, Result};
use matrixpool_proto::{
    read_message, read_message_with_limit, write_message, write_message_with_limit, FrameError, RpcRequest,
    RpcResponse, MAX_FRAME_SIZE,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Call-level error sent when a response exceeds the frame limit
pub const RESULT_TOO_LARGE: &str = "result too large";

/// Boxed future returned by a registered handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>;

type HandlerFn = Box<dyn Fn(serde_json::Value) -> HandlerFuture + Send + Sync>;

/// Named-method RPC server
pub struct RpcServer {
    /// Label used in logs ("coordinator", "worker localhost:9001", ...)
    name: String,

    handlers: HashMap<String, HandlerFn>,

    /// Largest request accepted and largest response sent, in bytes
    max_frame_size: usize,
}

impl RpcServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    /// Override the frame size limit for this server
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Register a typed handler under `method`
    ///
    /// Params are decoded from the request before the handler runs; a decode
    /// failure becomes a call-level error on the response.
    pub fn register<P, R, F, Fut>(&mut self, method: &str, handler: F)
    where
        P: DeserializeOwned + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let handler: HandlerFn = Box::new(move |params: serde_json::Value| -> HandlerFuture {
            match serde_json::from_value::<P>(params) {
                Ok(params) => {
                    let fut = handler(params);
                    Box::pin(async move { Ok(serde_json::to_value(fut.await)?) })
                }
                Err(e) => Box::pin(async move { Err(PoolError::Serialization(e)) }),
            }
        });

        self.handlers.insert(method.to_string(), handler);
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Run the accept loop until `shutdown` resolves
    ///
    /// Accept errors are logged and the loop continues. When `shutdown` fires
    /// the listener is dropped; connections already accepted keep running on
    /// their own tasks.
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        let server = Arc::new(self);
        info!("{} listening on {}", server.name, local_addr);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("{} stopping accept loop on {}", server.name, local_addr);
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("{} accepted connection from {}", server.name, peer);
                        let server = server.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream).await {
                                warn!("{} connection from {} failed: {}", server.name, peer, e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("{} connection error: {}", server.name, e);
                    }
                }
            }
        }

        drop(listener);
        Ok(())
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> Result<()> {
        loop {
            let request: RpcRequest = match read_message_with_limit(&mut stream, self.max_frame_size).await {
                Ok(request) => request,
                Err(FrameError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            let id = request.id.clone();
            let response = self.dispatch(request).await;
            match write_message_with_limit(&mut stream, &response, self.max_frame_size).await {
                Err(FrameError::TooLarge { size, max }) => {
                    warn!("{} response to {} is {} bytes, over the {} byte limit", self.name, id, size, max);
                    write_message(&mut stream, &RpcResponse::err(id, RESULT_TOO_LARGE)).await?;
                }
                written => written?,
            }
        }
    }

    async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        let RpcRequest { id, method, params } = request;

        let Some(handler) = self.handlers.get(&method) else {
            warn!("{} received unknown method {}", self.name, method);
            return RpcResponse::err(id, format!("unknown method: {}", method));
        };

        debug!("{} handling {} ({})", self.name, method, id);

        match handler(params).await {
            Ok(result) => RpcResponse::ok(id, result),
            Err(e) => RpcResponse::err(id, e.to_string()),
        }
    }
}

/// Open a connection to `address`, make one call and close it
///
/// A failure to connect is reported as `PoolError::Connection`; every failure
/// after that (framing, call-level error, undecodable result) is not.
pub async fn call<P, R>(address: &str, method: &str, params: &P) -> Result<R>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let mut stream = TcpStream::connect(address)
        .await
        .map_err(|e| PoolError::connection(format!("Failed to connect to {}: {}", address, e)))?;

    let request = RpcRequest::new(method, params)?;
    write_message(&mut stream, &request).await?;

    let response: RpcResponse = read_message(&mut stream).await?;

    if response.id != request.id {
        return Err(PoolError::rpc(format!(
            "response id {} does not match request id {}",
            response.id, request.id
        )));
    }

    if let Some(error) = response.error {
        return Err(PoolError::rpc(error));
    }

    let result = response
        .result
        .ok_or_else(|| PoolError::rpc("response carried neither result nor error"))?;

    Ok(serde_json::from_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::sync::oneshot;

    async fn start_echo_server() -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let mut server = RpcServer::new("echo");
        server.register("Echo.Upper", |text: String| async move { text.to_uppercase() });
        server.register("Echo.Sum", |values: Vec<i64>| async move { values.iter().sum::<i64>() });
        server.register("Echo.Repeat", |count: usize| async move { "x".repeat(count) });
        let server = server.with_max_frame_size(4096);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve(listener, async move {
            let _ = rx.await;
        }));

        (addr, tx, handle)
    }

    #[tokio::test]
    async fn test_call_round_trip() {
        let (addr, _tx, _handle) = start_echo_server().await;
        let addr = addr.to_string();

        let upper: String = call(&addr, "Echo.Upper", &"matrix").await.unwrap();
        assert_eq!(upper, "MATRIX");

        let sum: i64 = call(&addr, "Echo.Sum", &vec![1i64, 2, 3]).await.unwrap();
        assert_eq!(sum, 6);
    }

    #[tokio::test]
    async fn test_unknown_method_is_rpc_error() {
        let (addr, _tx, _handle) = start_echo_server().await;

        let err = call::<_, String>(&addr.to_string(), "Echo.Missing", &"x").await.unwrap_err();
        assert!(matches!(err, PoolError::Rpc(ref msg) if msg.contains("unknown method")));
    }

    #[tokio::test]
    async fn test_bad_params_is_rpc_error() {
        let (addr, _tx, _handle) = start_echo_server().await;

        let err = call::<_, i64>(&addr.to_string(), "Echo.Sum", &"not a list").await.unwrap_err();
        assert!(matches!(err, PoolError::Rpc(_)));
    }

    #[tokio::test]
    async fn test_oversized_response_becomes_rpc_error() {
        let (addr, _tx, _handle) = start_echo_server().await;
        let addr = addr.to_string();

        let err = call::<_, String>(&addr, "Echo.Repeat", &10_000usize).await.unwrap_err();
        assert!(matches!(err, PoolError::Rpc(ref msg) if msg == RESULT_TOO_LARGE));

        // The server keeps answering calls that fit
        let small: String = call(&addr, "Echo.Repeat", &3usize).await.unwrap();
        assert_eq!(small, "xxx");
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = call::<_, String>(&addr.to_string(), "Echo.Upper", &"x").await.unwrap_err();
        assert!(matches!(err, PoolError::Connection(_)));
    }

    #[tokio::test]
    async fn test_shutdown_closes_listener() {
        let (addr, tx, handle) = start_echo_server().await;

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        let err = call::<_, String>(&addr.to_string(), "Echo.Upper", &"x").await.unwrap_err();
        assert!(matches!(err, PoolError::Connection(_)));
    }
}
