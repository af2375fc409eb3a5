use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the upstream endpoint-discovery response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub path: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Vec<String>>,
    #[serde(default, alias = "required")]
    pub required_parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEndpoint {
    pub path: String,
    pub asset: String,
    pub category: String,
    /// Remainder of the path after the category segment; may contain `/`.
    pub metric: String,
    pub parameters: BTreeMap<String, Vec<String>>,
    pub required_parameters: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvalidParameter {
    pub name: String,
    pub value: String,
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterValidation {
    pub valid: bool,
    pub missing: Vec<String>,
    pub invalid: Vec<InvalidParameter>,
}

impl ParameterValidation {
    pub fn errors(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .missing
            .iter()
            .map(|name| format!("Missing required parameter: {}", name))
            .collect();
        for bad in &self.invalid {
            let mut allowed = bad.allowed.iter().take(10).cloned().collect::<Vec<_>>().join(", ");
            if bad.allowed.len() > 10 {
                allowed.push_str(", ...");
            }
            errors.push(format!(
                "Invalid value '{}' for parameter '{}'. Allowed: {}",
                bad.value, bad.name, allowed
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointQuery {
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
}
