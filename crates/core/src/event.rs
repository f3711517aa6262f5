//! Nach aussen sichtbare Stage-Ereignisse
//!
//! Jeder Zustandsuebergang eines StageClients erzeugt genau ein Ereignis.
//! Der StageManager ergaenzt beim Weiterleiten die `group_id`, damit ein
//! Bot der in vielen Gruppen gleichzeitig auf der Stage steht die
//! Ereignisse der richtigen Session zuordnen kann.
//!
//! Die Ereignisse fliessen ueber einen tokio-Broadcast-Kanal; Empfaenger
//! abonnieren via `StageService::events()`.

use crate::types::GroupId;
use serde::{Deserialize, Serialize};

/// Alle Stage-Ereignisse die das SDK nach aussen meldet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RudelEvent {
    /// SDP-Offer erstellt, Verbindungsaufbau laeuft
    StageClientVerbindet { group_id: GroupId },
    /// Join-Antwort mit SDP-Answer angewendet
    StageClientVerbunden { group_id: GroupId },
    /// Transport meldet den Peer-Kanal als vollstaendig etabliert
    StageClientBereit { group_id: GroupId },
    /// Session selbst beendet (leave_slot / stop)
    StageClientGetrennt { group_id: GroupId },
    /// Session durch Dritte beendet (Server-Push mit fremdem Ausloeser)
    StageClientGekickt { group_id: GroupId },
    /// Verhandlung oder Transport fehlgeschlagen, Session abgebaut
    StageClientFehler { group_id: GroupId, grund: String },
    /// Broadcast gestartet
    StageBroadcastGestartet { group_id: GroupId },
    /// Broadcast beendet
    StageBroadcastGestoppt { group_id: GroupId },
    /// Eigener Slot wurde stummgeschaltet
    StageClientStumm { group_id: GroupId },
    /// Eigener Slot wurde freigeschaltet
    StageClientFreigeschaltet { group_id: GroupId },
    /// Sekundentakt waehrend eines laufenden Broadcasts
    StageBroadcastDauer { group_id: GroupId, sekunden: u64 },
}

impl RudelEvent {
    /// Gibt die Gruppen-ID zurueck zu der das Ereignis gehoert
    pub fn group_id(&self) -> GroupId {
        match self {
            Self::StageClientVerbindet { group_id }
            | Self::StageClientVerbunden { group_id }
            | Self::StageClientBereit { group_id }
            | Self::StageClientGetrennt { group_id }
            | Self::StageClientGekickt { group_id }
            | Self::StageClientFehler { group_id, .. }
            | Self::StageBroadcastGestartet { group_id }
            | Self::StageBroadcastGestoppt { group_id }
            | Self::StageClientStumm { group_id }
            | Self::StageClientFreigeschaltet { group_id }
            | Self::StageBroadcastDauer { group_id, .. } => *group_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_id_aus_jedem_ereignis() {
        let gid = GroupId(100);
        let ereignisse = [
            RudelEvent::StageClientVerbindet { group_id: gid },
            RudelEvent::StageClientGekickt { group_id: gid },
            RudelEvent::StageBroadcastDauer {
                group_id: gid,
                sekunden: 12,
            },
        ];
        for e in &ereignisse {
            assert_eq!(e.group_id(), gid);
        }
    }

    #[test]
    fn ereignisse_sind_serde_kompatibel() {
        let e = RudelEvent::StageClientFehler {
            group_id: GroupId(5),
            grund: "SDP abgelehnt".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let e2: RudelEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(e, e2);
    }
}
