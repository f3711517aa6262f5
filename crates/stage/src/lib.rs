//! rudel-stage – Live-Audio-Sessions pro Gruppe
//!
//! Dieses Crate implementiert das Stage-Subsystem des Rudel-SDKs: pro
//! Gruppe eine unabhaengige WebRTC-Session, gemultiplext ueber beliebig
//! viele gleichzeitig aktive Gruppen, synchronisiert gegen das vom
//! Server gepushte Slot-Modell.
//!
//! ## Architektur
//!
//! ```text
//! Aufrufer
//!     |
//!     v
//! StageService            Validierung, Settings-Gate, Vorbedingungen
//!     |
//!     +-- SlotRegister    Slot-Cache pro Gruppe (Pull + Push-Merge)
//!     +-- StageManager    Registry: hoechstens ein Client pro Gruppe
//!     |       |
//!     |       v
//!     |   StageClient     Zustandsmaschine, SDP-Verhandlung, Broadcast
//!     |       |
//!     |       v
//!     |   PeerConnection  Offer/Answer, Bereit-Signal, Audio-Frames
//!     |
//!     +-- SignalingChannel  Kommandos an den Plattform-Server
//!
//! Push-Events  -> StageService -> Routing nach Gruppen-ID -> StageClient
//! Client-Events -> StageManager -> RudelEvent (+ group_id) -> Event-Bus
//! ```
//!
//! Alle Operationen sind kooperativ-nebenlaeufig: Sessions verschiedener
//! Gruppen verzahnen sich nur an Suspendierungspunkten, die Registry ist
//! der einzige veraenderliche geteilte Zustand.

pub mod client;
pub mod directory;
pub mod facade;
pub mod manager;
pub mod rtc;
pub mod slots;

#[cfg(test)]
mod tests;

// Bequeme Re-Exporte
pub use client::{BroadcastState, ClientEreignis, ConnectionState, StageClient};
pub use directory::{GroupDirectory, GroupProfile, Identitaet};
pub use facade::StageService;
pub use manager::StageManager;
pub use rtc::{PeerConnection, PeerConnectionFactory};
pub use slots::SlotRegister;
