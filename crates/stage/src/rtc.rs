//! Schnittstelle zur WebRTC-artigen Peer-Verbindung
//!
//! Jede Stage-Session besitzt genau eine Peer-Verbindung. Das Subsystem
//! kennt vom Medientransport nur vier Faehigkeiten: Offer erstellen,
//! Answer anwenden, auf das einmalige Bereit-Signal warten und
//! Audio-Frames senden. Codec-Arbeit und ICE-Details bleiben komplett
//! hinter diesem Trait.

use async_trait::async_trait;
use bytes::Bytes;
use rudel_core::types::GroupId;
use rudel_core::Result;
use std::sync::Arc;

/// Eine Peer-Verbindung fuer genau einen Verbindungsversuch
///
/// Das Bereit-Signal ist eine Einmal-Benachrichtigung: der Transport
/// meldet damit dass der Peer-Kanal vollstaendig etabliert ist
/// (CONNECTED -> READY). Nach `schliessen` ist die Verbindung
/// unbrauchbar; eine neue Session erstellt eine neue Verbindung.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Erstellt das SDP-Offer fuer den Verbindungsaufbau
    async fn create_offer(&self) -> Result<String>;

    /// Wendet die SDP-Answer des Servers an
    async fn apply_answer(&self, sdp: &str) -> Result<()>;

    /// Wartet auf das einmalige Bereit-Signal des Transports
    ///
    /// Liefert einen Fehler wenn die Verbindung scheitert bevor sie
    /// bereit wird.
    async fn warte_auf_bereit(&self) -> Result<()>;

    /// Sendet einen Audio-Frame ueber die etablierte Verbindung
    async fn sende_audio(&self, frame: Bytes) -> Result<()>;

    /// Baut die Verbindung ab (idempotent)
    async fn schliessen(&self);
}

/// Fabrik fuer Peer-Verbindungen, eine pro Session
pub trait PeerConnectionFactory: Send + Sync {
    /// Erstellt eine frische Peer-Verbindung fuer eine Gruppen-Session
    fn verbindung_erstellen(&self, group_id: GroupId) -> Arc<dyn PeerConnection>;
}
