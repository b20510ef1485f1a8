// Device and client operations.

use serde_json::{Value, json};
use tracing::info;
use unigate_api::ApiRequest;

use super::args;
use crate::error::CoreError;
use crate::registry::{Category, OperationDescriptor, ToolContext};

const DEVICES: &str = "api/s/{site}/stat/device";
const DEVMGR: &str = "api/s/{site}/cmd/devmgr";
const CLIENTS: &str = "api/s/{site}/stat/sta";

async fn list_devices(ctx: ToolContext, args: Value) -> Result<Value, CoreError> {
    let kind = args::optional_str(&args, "type")?;
    let envelope = ctx.client.request(ApiRequest::get(DEVICES)).await?;
    let devices = envelope
        .data
        .into_iter()
        .filter(|d| kind.is_none_or(|k| d.get("type").and_then(Value::as_str) == Some(k)))
        .collect();
    Ok(Value::Array(devices))
}

async fn restart_device(ctx: ToolContext, args: Value) -> Result<Value, CoreError> {
    let mac = args::mac(&args, "mac")?;
    info!(%mac, "restarting device");
    let body = json!({ "cmd": "restart", "mac": mac });
    let envelope = ctx.client.request(ApiRequest::post(DEVMGR, body)).await?;
    Ok(envelope.into_data())
}

async fn list_clients(ctx: ToolContext, args: Value) -> Result<Value, CoreError> {
    let limit = args::optional_u64(&args, "limit")?;
    let envelope = ctx.client.request(ApiRequest::get(CLIENTS)).await?;
    let clients = match limit.and_then(|l| usize::try_from(l).ok()) {
        Some(limit) => envelope.data.into_iter().take(limit).collect(),
        None => envelope.data,
    };
    Ok(Value::Array(clients))
}

pub(super) fn operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::new("unifi_list_devices", Category::Devices, list_devices)
            .with_description("List adopted devices (access points, switches, gateways)")
            .with_endpoint(DEVICES)
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "description": "Only devices of this type (uap, usw, ugw, udm)"
                    }
                }
            })),
        OperationDescriptor::new("unifi_restart_device", Category::Devices, restart_device)
            .with_description("Restart a device by MAC address")
            .with_endpoint(DEVMGR)
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "mac": { "type": "string", "description": "Device MAC address" }
                },
                "required": ["mac"]
            })),
        OperationDescriptor::new("unifi_list_clients", Category::Clients, list_clients)
            .with_description("List connected clients")
            .with_endpoint(CLIENTS)
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "Maximum number of clients" }
                }
            })),
    ]
}
