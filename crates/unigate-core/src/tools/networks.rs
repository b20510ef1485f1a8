// Network configuration operations.

use serde_json::{Map, Value, json};
use tracing::info;
use unigate_api::ApiRequest;

use super::args;
use crate::error::CoreError;
use crate::registry::{Category, OperationDescriptor, ToolContext};

const NETWORKS: &str = "api/s/{site}/rest/networkconf";
const PURPOSES: &[&str] = &["corporate", "guest", "vlan-only"];

async fn list_networks(ctx: ToolContext, _args: Value) -> Result<Value, CoreError> {
    let envelope = ctx.client.request(ApiRequest::get(NETWORKS)).await?;
    Ok(envelope.into_data())
}

async fn create_network(ctx: ToolContext, args: Value) -> Result<Value, CoreError> {
    let body = network_body(&args)?;
    info!(name = ?body.get("name"), "creating network");
    let envelope = ctx
        .client
        .request(ApiRequest::post(NETWORKS, Value::Object(body)))
        .await?;
    Ok(envelope.first().clone())
}

fn network_body(args: &Value) -> Result<Map<String, Value>, CoreError> {
    let name = args::required_str(args, "name")?;
    let purpose = args::optional_str(args, "purpose")?.unwrap_or("corporate");
    if !PURPOSES.contains(&purpose) {
        return Err(CoreError::Validation {
            message: format!(
                "argument 'purpose' must be one of {}, got {purpose}",
                PURPOSES.join(", ")
            ),
        });
    }
    let vlan = args::vlan(args, "vlan")?;
    let subnet = args::optional_str(args, "subnet")?;
    if subnet.is_some_and(|s| !s.contains('/')) {
        return Err(CoreError::Validation {
            message: format!(
                "argument 'subnet' must be in CIDR form, got {}",
                subnet.unwrap_or_default()
            ),
        });
    }
    if purpose == "vlan-only" && vlan.is_none() {
        return Err(CoreError::Validation {
            message: "a vlan-only network needs a 'vlan'".into(),
        });
    }

    let mut body = Map::new();
    body.insert("name".into(), json!(name));
    body.insert("purpose".into(), json!(purpose));
    body.insert("enabled".into(), json!(true));
    body.insert("vlan_enabled".into(), json!(vlan.is_some()));
    if let Some(vlan) = vlan {
        body.insert("vlan".into(), json!(vlan));
    }
    if let Some(subnet) = subnet {
        body.insert("ip_subnet".into(), json!(subnet));
    }
    Ok(body)
}

pub(super) fn operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::new("unifi_list_networks", Category::Networks, list_networks)
            .with_description("List configured networks and VLANs")
            .with_endpoint(NETWORKS),
        OperationDescriptor::new("unifi_create_network", Category::Networks, create_network)
            .with_description("Create a network, optionally on a VLAN")
            .with_endpoint(NETWORKS)
            .with_input_schema(json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "purpose": { "type": "string", "enum": PURPOSES },
                    "vlan": { "type": "integer", "minimum": 1, "maximum": 4094 },
                    "subnet": { "type": "string", "description": "Gateway IP in CIDR form, e.g. 10.20.0.1/24" }
                },
                "required": ["name"]
            })),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn body_defaults() {
        let body = network_body(&json!({ "name": "IoT" })).unwrap();
        assert_eq!(body["purpose"], "corporate");
        assert_eq!(body["vlan_enabled"], false);
        assert!(body.get("vlan").is_none());
    }

    #[test]
    fn body_with_vlan_and_subnet() {
        let body =
            network_body(&json!({ "name": "IoT", "vlan": 20, "subnet": "10.20.0.1/24" })).unwrap();
        assert_eq!(body["vlan"], 20);
        assert_eq!(body["vlan_enabled"], true);
        assert_eq!(body["ip_subnet"], "10.20.0.1/24");
    }

    #[test]
    fn body_rejections() {
        assert!(network_body(&json!({ "name": "x", "purpose": "wan" })).is_err());
        assert!(network_body(&json!({ "name": "x", "subnet": "10.0.0.1" })).is_err());
        assert!(network_body(&json!({ "name": "x", "purpose": "vlan-only" })).is_err());
        assert!(network_body(&json!({ "purpose": "guest" })).is_err());
    }
}
