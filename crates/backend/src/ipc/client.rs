use std::{
  collections::HashMap,
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::{
  net::UnixStream,
  sync::{mpsc, oneshot},
};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, warn};

use super::{IpcError, Request, Response};

type FramedStream = Framed<UnixStream, LinesCodec>;

struct OutboundRequest {
  request: Request,
  response_tx: oneshot::Sender<Response>,
}

/// Trait for typed IPC requests that know their command and response type.
///
/// Implement this trait for request parameter types to enable type-safe
/// request/response handling via `Client::call_typed()`.
pub trait IpcRequest: Serialize {
  /// Command name the request is dispatched under.
  const COMMAND: &'static str;

  /// The expected response type for this request.
  type Response;

  /// Extract the typed response from a raw result.
  fn extract(result: Option<serde_json::Value>) -> Result<Self::Response, IpcError>;
}

/// Client for connecting to a running host.
///
/// Calls are multiplexed over one connection; each call gets its own id and
/// responses are matched back regardless of the order the host answers in.
#[derive(Clone)]
pub struct Client {
  request_tx: mpsc::Sender<OutboundRequest>,
  counter: Arc<AtomicU64>,
}

impl Client {
  pub async fn connect_to(socket_path: &Path) -> Result<Self, IpcError> {
    let stream = UnixStream::connect(socket_path)
      .await
      .map_err(|e| IpcError::Connection(format!("{}: {}", socket_path.display(), e)))?;
    let framed = Framed::new(stream, LinesCodec::new());
    let (sink, read_stream) = framed.split();

    let (request_tx, request_rx) = mpsc::channel(64);
    tokio::spawn(Self::multiplexer(sink, read_stream, request_rx));

    Ok(Self {
      request_tx,
      counter: Arc::new(AtomicU64::new(1)),
    })
  }

  async fn multiplexer(
    mut sink: futures::stream::SplitSink<FramedStream, String>,
    mut stream: futures::stream::SplitStream<FramedStream>,
    mut request_rx: mpsc::Receiver<OutboundRequest>,
  ) {
    let mut pending: HashMap<String, oneshot::Sender<Response>> = HashMap::new();

    loop {
      tokio::select! {
        outbound = request_rx.recv() => {
          let Some(outbound) = outbound else {
            debug!("all client handles dropped");
            break;
          };
          let id = outbound.request.id.clone();
          match serde_json::to_string(&outbound.request) {
            Ok(json) => {
              pending.insert(id.clone(), outbound.response_tx);
              if let Err(e) = sink.send(json).await {
                error!("failed to send request: {e}");
                if let Some(tx) = pending.remove(&id) {
                  let _ = tx.send(Response::error(id, IpcError::Connection(e.to_string())));
                }
              }
            }
            Err(e) => {
              let _ = outbound.response_tx.send(Response::error(id, IpcError::Serde(e.to_string())));
            }
          }
        }

        result = stream.next() => {
          match result {
            Some(Ok(line)) => {
              match serde_json::from_str::<Response>(&line) {
                Ok(response) => {
                  let id = response.id.clone();
                  match pending.remove(&id) {
                    Some(tx) => {
                      if tx.send(response).is_err() {
                        debug!("receiver dropped for request {id}");
                      }
                    }
                    None => warn!("received response for unknown request id: {id}"),
                  }
                }
                Err(e) => {
                  error!("failed to parse response: {e}");
                }
              }
            }
            Some(Err(e)) => {
              error!("connection error: {e}");
              break;
            }
            None => {
              debug!("connection closed");
              break;
            }
          }
        }
      }
    }

    for (id, tx) in pending {
      let _ = tx.send(Response::error(id, IpcError::Connection("connection closed".into())));
    }

    debug!("multiplexer exited");
  }

  /// Send a typed request and receive a typed response.
  ///
  /// This is the preferred API when you want compile-time type safety.
  /// The command and response type are determined by the request type via
  /// `IpcRequest`.
  pub async fn call_typed<R: IpcRequest>(&self, req: R) -> Result<R::Response, IpcError> {
    let payload = serde_json::to_value(&req)?;
    let result = self.call(R::COMMAND, payload).await?;
    R::extract(result)
  }

  /// Send a command and wait for its result.
  ///
  /// `Ok(None)` means the host handled the command and had nothing to return.
  pub async fn call(&self, command: &str, payload: serde_json::Value) -> Result<Option<serde_json::Value>, IpcError> {
    let id = self.counter.fetch_add(1, Ordering::Relaxed);

    let request = Request {
      id: id.to_string(),
      command: command.to_string(),
      payload,
    };

    let response = self.raw_request(request).await?;
    response.into_result()
  }

  /// Send a raw request and receive its response.
  async fn raw_request(&self, request: Request) -> Result<Response, IpcError> {
    let (response_tx, response_rx) = oneshot::channel();

    self
      .request_tx
      .send(OutboundRequest { request, response_tx })
      .await
      .map_err(|_| IpcError::Connection("multiplexer died".into()))?;

    response_rx
      .await
      .map_err(|_| IpcError::Connection("no response received".into()))
  }
}
