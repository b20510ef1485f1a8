// Built-in operations: thin handlers over the resilient client.

mod args;
mod devices;
mod firewall;
mod networks;
mod system;

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::registry::OperationDescriptor;

/// Every built-in operation, ready for `ToolRegistry::register_batch`.
pub fn builtin_operations() -> Vec<OperationDescriptor> {
    let mut ops = system::operations();
    ops.extend(devices::operations());
    ops.extend(networks::operations());
    ops.extend(firewall::operations());
    ops
}

fn to_data<T: Serialize + ?Sized>(value: &T) -> Result<Value, CoreError> {
    serde_json::to_value(value).map_err(|e| CoreError::Execution {
        message: format!("failed to encode result: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::registry::Category;

    #[test]
    fn builtin_names_are_unique_and_described() {
        let ops = builtin_operations();
        let names: HashSet<&str> = ops.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names.len(), ops.len());
        assert!(ops.iter().all(|o| o.name.starts_with("unifi_")));
        assert!(ops.iter().all(|o| !o.description.is_empty()));
    }

    #[test]
    fn every_category_is_covered() {
        let ops = builtin_operations();
        for category in [
            Category::System,
            Category::Devices,
            Category::Clients,
            Category::Networks,
            Category::Firewall,
            Category::Zones,
            Category::Routing,
        ] {
            assert!(ops.iter().any(|o| o.category == category), "{category}");
        }
    }

    #[test]
    fn sysinfo_operation_shares_the_client_path() {
        let ops = builtin_operations();
        let sysinfo = ops.iter().find(|o| o.name == "unifi_get_system_info");
        assert!(sysinfo.is_some_and(|o| o.endpoints == [unigate_api::SYSINFO_PATH]));
        assert!(
            crate::CapabilityTables::default()
                .endpoints
                .iter()
                .any(|e| e.path == unigate_api::SYSINFO_PATH)
        );
    }
}
