//! `serve` subcommand: line-delimited JSON over stdio.
//!
//! Each input line is a request `{"id", "method", "params"}`; each gets
//! exactly one response line `{"id", "result"}` or `{"id", "error"}`.
//! Failed invocations are still results: the `InvocationResult` carries
//! its own error.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use unigate_core::Gateway;

use super::capabilities::snapshot_view;
use super::try_connect;
use crate::error::CliError;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ProtocolError>,
}

#[derive(Debug, Serialize)]
struct ProtocolError {
    code: String,
    message: String,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ProtocolError {
                code: code.to_owned(),
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InvokeParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
struct CapabilityParams {
    #[serde(default)]
    refresh: bool,
}

pub async fn handle(gateway: &Gateway) -> Result<(), CliError> {
    try_connect(gateway).await;

    let monitor = gateway.start_monitor().await.map(|mut reports| {
        tokio::spawn(async move {
            while reports.changed().await.is_ok() {
                let report = reports.borrow_and_update().clone();
                if let Some(report) = report.filter(|r| !r.is_healthy()) {
                    warn!(error = ?report.last_error, "controller health check failed");
                }
            }
        })
    });

    info!("serving line-delimited JSON on stdio");
    let reader = BufReader::new(tokio::io::stdin());
    let served = serve_stream(gateway, reader, tokio::io::stdout(), async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    if let Some(task) = monitor {
        task.abort();
    }
    served?;
    Ok(())
}

/// Answer requests from `reader` until EOF or `shutdown` resolves.
pub(crate) async fn serve_stream<R, W>(
    gateway: &Gateway,
    reader: R,
    mut writer: W,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(gateway, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn handle_line(gateway: &Gateway, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return Response::error(Value::Null, "PARSE_ERROR", e.to_string()),
    };
    debug!(method = %request.method, "request");
    let id = request.id;

    match request.method.as_str() {
        "list_operations" => Response::ok(id, to_value(&gateway.list_operations().await)),

        "invoke" => match serde_json::from_value::<InvokeParams>(request.params) {
            Ok(params) => {
                let result = gateway.invoke(&params.name, params.arguments).await;
                Response::ok(id, to_value(&result))
            }
            Err(e) => Response::error(id, "INVALID_PARAMS", e.to_string()),
        },

        "health" => Response::ok(id, to_value(&gateway.health_check().await)),

        "capabilities" => {
            let params = if request.params.is_null() {
                CapabilityParams::default()
            } else {
                match serde_json::from_value::<CapabilityParams>(request.params) {
                    Ok(params) => params,
                    Err(e) => return Response::error(id, "INVALID_PARAMS", e.to_string()),
                }
            };
            match gateway.capabilities(params.refresh).await {
                Ok(snapshot) => Response::ok(id, snapshot_view(&snapshot)),
                Err(e) => Response::error(id, e.kind().code(), e.to_string()),
            }
        }

        "stats" => Response::ok(id, to_value(&gateway.stats())),

        other => Response::error(id, "METHOD_NOT_FOUND", format!("unknown method '{other}'")),
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "error": e.to_string() }))
}
