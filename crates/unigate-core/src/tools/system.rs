// System operations: sysinfo, health, capabilities.

use serde_json::{Value, json};
use unigate_api::SYSINFO_PATH;

use super::to_data;
use crate::error::CoreError;
use crate::registry::{Category, OperationDescriptor, ToolContext};

async fn get_system_info(ctx: ToolContext, _args: Value) -> Result<Value, CoreError> {
    let info = ctx.client.get_system_info().await?;
    to_data(&info)
}

async fn health_check(ctx: ToolContext, _args: Value) -> Result<Value, CoreError> {
    let report = ctx.client.health_check().await;
    to_data(&report)
}

async fn get_capabilities(ctx: ToolContext, args: Value) -> Result<Value, CoreError> {
    let refresh = args.get("refresh").and_then(Value::as_bool).unwrap_or(false);
    let snapshot = if refresh {
        ctx.detector.force_detection().await?
    } else {
        ctx.detector.detect_capabilities().await?
    };
    let mut data = to_data(snapshot.as_ref())?;
    if let Value::Object(ref mut map) = data {
        map.insert("featureFlags".into(), to_data(&snapshot.feature_flags())?);
    }
    Ok(data)
}

pub(super) fn operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::new("unifi_get_system_info", Category::System, get_system_info)
            .with_description("Get controller version, model and hostname")
            .with_endpoint(SYSINFO_PATH),
        OperationDescriptor::new("unifi_health_check", Category::System, health_check)
            .with_description("Check controller connectivity, authentication and latency")
            .requires_connection(false),
        OperationDescriptor::new("unifi_get_capabilities", Category::System, get_capabilities)
            .with_description("Describe supported features, endpoints and hardware limits")
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "refresh": {
                        "type": "boolean",
                        "description": "Bypass the capability cache"
                    }
                }
            })),
    ]
}
