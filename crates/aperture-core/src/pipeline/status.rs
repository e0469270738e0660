//! Status query path.
//!
//! The read side of the pipeline: given a client-facing identifier, the
//! resolver reconstructs the stored key (the client omits the ingestion
//! prefix), performs one lookup, and maps the outcome to an HTTP-style
//! response. Not-found is a valid negative result, never an error; only
//! transport failures surface as store-unavailable.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::QueryConfig;
use crate::error::PipelineError;
use crate::store::{KvStore, StoreItem, StoreValue};

/// HTTP-style response for the query interface.
///
/// Internal error detail is never echoed to the caller, only logged.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: Value,
}

impl QueryResponse {
    fn with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![
                ("Content-Type", "application/json"),
                ("Access-Control-Allow-Origin", "*"),
            ],
            body,
        }
    }
}

/// Resolves persisted records for client status queries.
pub struct StatusResolver {
    kv: Arc<dyn KvStore>,
    config: QueryConfig,
}

impl StatusResolver {
    /// Create a new resolver reading from the given record store.
    pub fn new(kv: Arc<dyn KvStore>, config: QueryConfig) -> Self {
        Self { kv, config }
    }

    /// Reconstruct the stored key from a client-facing identifier.
    ///
    /// Strips a single leading separator, then prepends the ingestion
    /// prefix the stored keys carry.
    fn storage_key(&self, image_id: &str) -> String {
        let trimmed = image_id.strip_prefix('/').unwrap_or(image_id);
        format!(
            "{}/{}",
            self.config.key_prefix.trim_end_matches('/'),
            trimmed
        )
    }

    /// Look up the record for a client-facing identifier.
    ///
    /// `Ok(None)` means no record exists under the reconstructed key.
    pub async fn lookup(&self, image_id: &str) -> Result<Option<StoreItem>, PipelineError> {
        let key = self.storage_key(image_id);
        tracing::debug!(key = %key, "resolving status");
        self.kv
            .get_item(&key)
            .await
            .map_err(|e| PipelineError::StoreUnavailable {
                message: e.to_string(),
            })
    }

    /// Handle a status query, mapping every outcome to a structured
    /// response: 200 found, 400 missing identifier, 404 not found, 500
    /// store failure.
    pub async fn respond(&self, image_id: Option<&str>) -> QueryResponse {
        let id = match image_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                return QueryResponse::with_status(
                    400,
                    json!({"error": "filename path parameter is missing."}),
                )
            }
        };

        match self.lookup(id).await {
            Ok(Some(item)) => QueryResponse::with_status(200, item_to_json(&item)),
            Ok(None) => {
                tracing::debug!(image_id = %id, "no record found");
                QueryResponse::with_status(
                    404,
                    json!({"message": "image details not found for the given identifier."}),
                )
            }
            Err(e) => {
                tracing::error!(image_id = %id, error = %e, "status lookup failed");
                QueryResponse::with_status(
                    500,
                    json!({"error": "an internal error occurred while processing the request."}),
                )
            }
        }
    }
}

/// Render a stored item as a JSON body. Whole decimals become integers,
/// fractional ones floats; sentinel strings stay strings.
fn item_to_json(item: &StoreItem) -> Value {
    Value::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}
