//! Schnittstelle zum Request/Response-Transport
//!
//! Das Stage-Subsystem fasst das Socket-Framing nie selbst an: es sendet
//! signierte Kommandos ueber diesen Trait und erhaelt strukturierte
//! Antworten. Die konkrete Implementierung (Websocket-Verbindung der
//! Plattform) lebt ausserhalb dieses Subsystems; Tests verwenden eine
//! Mock-Implementierung.

use crate::commands::Command;
use crate::response::RpcResponse;
use async_trait::async_trait;
use rudel_core::Result;
use serde_json::Value;

/// Kommando-Kanal zum Plattform-Server
///
/// Implementierungen muessen pro Gruppe FIFO-Zustellung der Antworten
/// garantieren; das Stage-Subsystem ordnet nichts um.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Sendet ein Kommando mit Payload und wartet auf die Antwort
    async fn emit(&self, command: Command, payload: Value) -> Result<RpcResponse>;
}
