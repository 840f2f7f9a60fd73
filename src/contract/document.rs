//! In-memory contract model.
//!
//! A deliberately small subset of Swagger 2.0: only what routing and response
//! validation read. Unknown keys are ignored by serde.

use std::collections::BTreeMap;

use axum::http::Method;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Root of a loaded contract. Immutable once built.
#[derive(Debug, Clone)]
pub struct ContractDocument {
    /// Prefix joined in front of every path template.
    pub base_path: String,

    /// Path template → path item, in template order.
    pub paths: BTreeMap<String, PathItem>,

    /// The document as plain JSON, kept for resolving `$ref`s.
    pub raw: Value,
}

impl ContractDocument {
    /// Build the typed model from an already parsed JSON value.
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let shape: DocumentShape = serde_json::from_value(raw.clone())?;

        let mut paths = BTreeMap::new();
        for (template, item) in shape.paths {
            if template.starts_with("x-") {
                continue;
            }
            paths.insert(template, serde_json::from_value(item)?);
        }

        Ok(Self {
            base_path: shape.base_path.unwrap_or_default(),
            paths,
            raw,
        })
    }

    /// Shared schema definitions (`#/definitions`), if any.
    pub fn definitions(&self) -> Option<&Value> {
        self.raw.get("definitions")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentShape {
    base_path: Option<String>,
    #[serde(default)]
    paths: BTreeMap<String, Value>,
}

/// Operations declared under one path template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    pub delete: Option<Operation>,
    pub get: Option<Operation>,
    pub head: Option<Operation>,
    pub options: Option<Operation>,
    pub patch: Option<Operation>,
    pub post: Option<Operation>,
    pub put: Option<Operation>,
}

impl PathItem {
    /// Every method slot, declared or not, in the precedence order used to
    /// pick the governing operation: DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT.
    pub fn operations_by_precedence(&self) -> [(Method, Option<&Operation>); 7] {
        [
            (Method::DELETE, self.delete.as_ref()),
            (Method::GET, self.get.as_ref()),
            (Method::HEAD, self.head.as_ref()),
            (Method::OPTIONS, self.options.as_ref()),
            (Method::PATCH, self.patch.as_ref()),
            (Method::POST, self.post.as_ref()),
            (Method::PUT, self.put.as_ref()),
        ]
    }

    /// The one operation enforced for this path item: the first declared
    /// method in precedence order. Other declared methods are not enforced.
    pub fn governing_operation(&self) -> Option<(Method, &Operation)> {
        self.operations_by_precedence()
            .into_iter()
            .find_map(|(method, op)| op.map(|op| (method, op)))
    }
}

/// One method on one path template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,

    #[serde(default)]
    pub responses: Responses,
}

impl Operation {
    /// Declared contract for an exact status code. `default` is not consulted.
    pub fn response_for(&self, status: u16) -> Option<&ResponseContract> {
        self.responses.by_status.get(&status)
    }
}

/// Status-code keyed responses of an operation.
#[derive(Debug, Clone, Default)]
pub struct Responses {
    pub by_status: BTreeMap<u16, ResponseContract>,
    pub default: Option<ResponseContract>,
}

impl<'de> Deserialize<'de> for Responses {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let entries = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut responses = Responses::default();

        for (key, value) in entries {
            // Vendor extensions carry arbitrary payloads.
            if key.starts_with("x-") {
                continue;
            }
            let contract: ResponseContract = serde_json::from_value(value)
                .map_err(|e| D::Error::custom(format!("response `{}`: {}", key, e)))?;

            if key == "default" {
                responses.default = Some(contract);
            } else {
                let status = key
                    .parse::<u16>()
                    .map_err(|_| D::Error::custom(format!("invalid response status `{}`", key)))?;
                responses.by_status.insert(status, contract);
            }
        }

        Ok(responses)
    }
}

/// Expected shape of one declared response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContract {
    #[serde(default)]
    pub description: String,

    /// Body schema. Absent means the body shape is not checked.
    pub schema: Option<Value>,

    #[serde(default)]
    pub headers: BTreeMap<String, HeaderContract>,
}

/// Declared response header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeaderContract {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
}
