use std::{
    future,
    net::TcpListener,
    sync::{Arc, Mutex},
};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router, Server,
};
use hyper::body::Bytes;
use serde_json::Value;

/// Request received by a [`TestServer`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    /// Request method, e.g. `GET`.
    pub method: String,

    /// Request path, without the query string.
    pub path: String,

    /// Headers with lowercase names, in the order they were received.
    pub headers: Vec<(String, String)>,

    /// Full request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Find a header value by its lowercase name.
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Canned [`TestServer`] response.
pub(crate) enum Reply {
    /// Respond with a status code and a JSON body.
    Json(u16, Value),

    /// Keep the connection open without ever answering.
    Hang,
}

impl Reply {
    /// Shorthand for [`Reply::Json`].
    pub(crate) fn json(status: u16, body: Value) -> Self {
        Reply::Json(status, body)
    }
}

/// Function that picks a [`Reply`] for every received request.
type Handler = dyn Fn(&RecordedRequest) -> Reply + Send + Sync;

/// Shared state of the [`TestServer`] router.
#[derive(Clone)]
struct ServerState {
    /// Requests received so far.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,

    /// Reply selector.
    handler: Arc<Handler>,
}

/// Throwaway HTTP server that records every request and answers with a handler-provided [`Reply`].
pub(crate) struct TestServer {
    /// Base URL of the server, e.g. `http://127.0.0.1:4000`.
    pub url: String,

    /// Requests received so far.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    /// Start the server on a random local port.
    pub(crate) async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("unable to bind test server");
        let url = format!(
            "http://{}",
            listener.local_addr().expect("unable to get local address")
        );

        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new().fallback(record).with_state(ServerState {
            requests: requests.clone(),
            handler: Arc::new(handler),
        });

        let server = Server::from_tcp(listener)
            .expect("unable to create test server")
            .serve(app.into_make_service());

        tokio::spawn(server);

        Self { url, requests }
    }

    /// Requests received so far, in arrival order.
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("poisoned lock").clone()
    }
}

/// Record the request and answer it with the reply chosen by the handler.
async fn record(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_owned(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: body.to_vec(),
    };

    let reply = (state.handler)(&request);
    state.requests.lock().expect("poisoned lock").push(request);

    match reply {
        Reply::Json(status, body) => {
            let status = StatusCode::from_u16(status).expect("invalid status code");
            (status, Json(body)).into_response()
        }
        Reply::Hang => future::pending().await,
    }
}
