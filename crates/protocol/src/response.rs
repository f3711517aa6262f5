//! RPC-Antwort-Umschlag
//!
//! Jedes Kommando liefert eine Antwort der Form `{ success, body, headers }`.
//! Der Body ist zunaechst untypisiertes JSON; `body_als` deserialisiert ihn
//! in den erwarteten Antwort-Typ.

use rudel_core::{Result, RudelError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Strukturierte Antwort des Request/Response-Transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Hat der Server das Kommando akzeptiert?
    pub success: bool,
    /// Optionaler Plattform-Statuscode (HTTP-aehnlich)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Antwort-Koerper, kommandospezifisch
    #[serde(default)]
    pub body: Value,
    /// Transport-Header (Diagnose, Quotas)
    #[serde(default)]
    pub headers: Map<String, Value>,
}

impl RpcResponse {
    /// Erstellt eine erfolgreiche Antwort mit Body
    pub fn ok(body: Value) -> Self {
        Self {
            success: true,
            code: Some(200),
            body,
            headers: Map::new(),
        }
    }

    /// Erstellt eine abgelehnte Antwort mit Statuscode
    pub fn fehler(code: u16) -> Self {
        Self {
            success: false,
            code: Some(code),
            body: Value::Null,
            headers: Map::new(),
        }
    }

    /// Deserialisiert den Body in den erwarteten Typ
    pub fn body_als<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            RudelError::Transport(format!("Antwort-Body nicht deserialisierbar: {}", e))
        })
    }
}
