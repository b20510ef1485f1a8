// Firewall and routing operations. Legacy rules and zone-based policies
// coexist; which one a controller serves depends on its version and hardware.

use serde_json::Value;
use unigate_api::ApiRequest;

use crate::capability::Feature;
use crate::error::CoreError;
use crate::registry::{Category, OperationDescriptor, ToolContext};

const FIREWALL_RULES: &str = "api/s/{site}/rest/firewallrule";
const FIREWALL_ZONES: &str = "v2/api/site/{site}/firewall/zone";
const FIREWALL_POLICIES: &str = "v2/api/site/{site}/firewall-policies";
const TRAFFIC_ROUTES: &str = "v2/api/site/{site}/trafficroutes";

async fn get_list(ctx: &ToolContext, path: &str) -> Result<Value, CoreError> {
    let envelope = ctx.client.request(ApiRequest::get(path)).await?;
    Ok(envelope.into_data())
}

async fn list_firewall_rules(ctx: ToolContext, _args: Value) -> Result<Value, CoreError> {
    get_list(&ctx, FIREWALL_RULES).await
}

async fn list_firewall_zones(ctx: ToolContext, _args: Value) -> Result<Value, CoreError> {
    get_list(&ctx, FIREWALL_ZONES).await
}

async fn list_firewall_policies(ctx: ToolContext, _args: Value) -> Result<Value, CoreError> {
    get_list(&ctx, FIREWALL_POLICIES).await
}

async fn list_traffic_routes(ctx: ToolContext, _args: Value) -> Result<Value, CoreError> {
    get_list(&ctx, TRAFFIC_ROUTES).await
}

pub(super) fn operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::new(
            "unifi_list_firewall_rules",
            Category::Firewall,
            list_firewall_rules,
        )
        .with_description("List legacy firewall rules")
        .requires_feature(Feature::LegacyFirewall)
        .with_endpoint(FIREWALL_RULES),
        OperationDescriptor::new(
            "unifi_list_firewall_zones",
            Category::Zones,
            list_firewall_zones,
        )
        .with_description("List firewall zones")
        .with_endpoint(FIREWALL_ZONES),
        OperationDescriptor::new(
            "unifi_list_firewall_policies",
            Category::Firewall,
            list_firewall_policies,
        )
        .with_description("List zone-based firewall policies")
        .requires_feature(Feature::ZoneBasedFirewall)
        .with_endpoint(FIREWALL_POLICIES),
        OperationDescriptor::new(
            "unifi_list_traffic_routes",
            Category::Routing,
            list_traffic_routes,
        )
        .with_description("List policy-based traffic routes")
        .with_endpoint(TRAFFIC_ROUTES),
    ]
}
