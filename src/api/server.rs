//! hyper server for the stage endpoints.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::types::{
    ClassifyIntentRequest, ClassifyIntentResponse, ErrorResponse, FetchFileRequest,
    FetchFileResponse, GenerateResponseRequest, GenerateResponseResponse, InterpretCodeRequest,
    RetrieveDocumentsRequest, RetrieveDocumentsResponse,
};
use super::{
    CLASSIFY_INTENT_PATH, FETCH_FILE_PATH, GENERATE_RESPONSE_PATH, HEALTH_PATH,
    INTERPRET_CODE_PATH, METRICS_PATH, RETRIEVE_DOCUMENTS_PATH,
};
use crate::metrics;
use crate::pipeline::TurnPipeline;

const CLASSIFY_FAILED: &str = "An error occurred while processing your request.";
const RETRIEVE_FAILED: &str = "An error occurred while retrieving documents.";
const FETCH_FAILED: &str = "An error occurred while fetching files.";
const GENERATE_FAILED: &str = "An error occurred while generating the response.";
const INTERPRET_FAILED: &str = "An error occurred while executing code.";

/// Largest request body accepted; file sets travel in full.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, payload) = match serde_json::to_vec(body) {
        Ok(payload) => (status, payload),
        Err(err) => {
            error!("Failed to serialize response: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"serialization failed"}"#.to_vec(),
            )
        }
    };
    let mut response = Response::new(Full::from(payload));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

fn parse<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(body).map_err(|err| {
        warn!("Rejected request body: {}", err);
        error_response(StatusCode::BAD_REQUEST, "Invalid request body.")
    })
}

/// 200 with the payload, or 500 with the endpoint's fixed message.
fn reply<T: Serialize>(result: crate::Result<T>, failure: &str) -> Response<Full<Bytes>> {
    match result {
        Ok(payload) => json_response(StatusCode::OK, &payload),
        Err(err) => {
            error!(error = %err, "{}", failure);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, failure)
        }
    }
}

/// Fixed metric label so unknown paths do not add series.
fn endpoint_label(path: &str) -> &'static str {
    match path {
        CLASSIFY_INTENT_PATH => "classify_intent",
        RETRIEVE_DOCUMENTS_PATH => "retrieve_documents",
        FETCH_FILE_PATH => "fetch_file",
        GENERATE_RESPONSE_PATH => "generate_response",
        INTERPRET_CODE_PATH => "interpret_code",
        HEALTH_PATH => "health",
        METRICS_PATH => "metrics",
        _ => "other",
    }
}

async fn route(
    method: &str,
    path: &str,
    body: &Bytes,
    pipeline: &dyn TurnPipeline,
) -> Response<Full<Bytes>> {
    match (method, path) {
        ("GET", HEALTH_PATH) => json_response(StatusCode::OK, &json!({ "status": "ok" })),
        ("GET", METRICS_PATH) => match metrics::metrics_response().await {
            Ok(response) => response,
            Err(never) => match never {},
        },
        ("POST", CLASSIFY_INTENT_PATH) => match parse::<ClassifyIntentRequest>(body) {
            Ok(request) => reply(
                pipeline
                    .classify_intent(&request.messages)
                    .await
                    .map(|intent| ClassifyIntentResponse { intent }),
                CLASSIFY_FAILED,
            ),
            Err(response) => response,
        },
        ("POST", RETRIEVE_DOCUMENTS_PATH) => match parse::<RetrieveDocumentsRequest>(body) {
            Ok(request) => reply(
                pipeline
                    .retrieve_documents(&request.latest_message)
                    .await
                    .map(|relevant_docs| RetrieveDocumentsResponse { relevant_docs }),
                RETRIEVE_FAILED,
            ),
            Err(response) => response,
        },
        ("POST", FETCH_FILE_PATH) => match parse::<FetchFileRequest>(body) {
            Ok(request) => reply(
                pipeline
                    .fetch_files(&request.files_to_fetch, &request.existing_files)
                    .await
                    .map(|all_files| FetchFileResponse { all_files }),
                FETCH_FAILED,
            ),
            Err(response) => response,
        },
        ("POST", GENERATE_RESPONSE_PATH) => match parse::<GenerateResponseRequest>(body) {
            Ok(request) => reply(
                pipeline
                    .generate_response(&request.messages, &request.all_files)
                    .await
                    .map(|message| GenerateResponseResponse {
                        message,
                        files: request.all_files,
                    }),
                GENERATE_FAILED,
            ),
            Err(response) => response,
        },
        ("POST", INTERPRET_CODE_PATH) => match parse::<InterpretCodeRequest>(body) {
            Ok(request) => reply(pipeline.interpret_code(&request.code).await, INTERPRET_FAILED),
            Err(response) => response,
        },
        (_, path) if endpoint_label(path) != "other" => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
        }
        _ => error_response(StatusCode::NOT_FOUND, "Not found."),
    }
}

/// Handle one request against `pipeline`.
pub async fn handle_request<B>(
    req: Request<B>,
    pipeline: Arc<dyn TurnPipeline>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    handle_limited(req, pipeline, MAX_BODY_BYTES).await
}

async fn handle_limited<B>(
    req: Request<B>,
    pipeline: Arc<dyn TurnPipeline>,
    limit: usize,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    let response = match Limited::new(body, limit).collect().await {
        Ok(collected) => {
            route(
                parts.method.as_str(),
                &path,
                &collected.to_bytes(),
                pipeline.as_ref(),
            )
            .await
        }
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(limit, "Request body too large");
            error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large.")
        }
        Err(err) => {
            warn!("Failed to read request body: {}", err);
            error_response(StatusCode::BAD_REQUEST, "Invalid request body.")
        }
    };

    metrics::record_api_request(endpoint_label(&path), response.status());
    info!(
        method = %parts.method,
        path = %path,
        status = response.status().as_u16(),
        "API request"
    );
    Ok(response)
}

/// Accept connections on `listener` until it fails.
pub async fn serve_listener(
    listener: TcpListener,
    pipeline: Arc<dyn TurnPipeline>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Dataset chat API started");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let pipeline = pipeline.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle_request(req, pipeline.clone()));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "API connection error: {}", err);
            }
        });
    }
}

pub async fn serve(addr: SocketAddr, pipeline: Arc<dyn TurnPipeline>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, pipeline).await
}
