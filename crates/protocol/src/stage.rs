//! Stage-Nachrichten (Slots, Einstellungen, Verhandlung)
//!
//! Definiert die Payloads der Stage-Kommandos und die zugehoerigen
//! Antwort-Koerper. Das Wire-Format der Plattform ist camelCase-JSON,
//! daher tragen alle Wire-Strukturen `rename_all = "camelCase"`.
//!
//! Slots sind nie client-autoritativ: der Server haelt die Wahrheit,
//! das SDK spiegelt sie nur (Pull-Antworten und Push-Merges).

use rudel_core::types::{GroupId, SlotId, SubscriberId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Slot-Modell
// ---------------------------------------------------------------------------

/// Ein nummerierter Sitzplatz in der Stage einer Gruppe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Slot-Nummer, eindeutig innerhalb der Gruppe
    pub id: SlotId,
    /// Aktueller Belegender (None = frei)
    #[serde(default)]
    pub occupier_id: Option<SubscriberId>,
    /// Gesperrte Slots koennen nicht belegt werden
    #[serde(default)]
    pub locked: bool,
    /// Mute-Zustand des Belegenden
    #[serde(default)]
    pub occupier_muted: bool,
    /// Anzeige-Daten des Belegenden, aus Mitglieder-Events gepflegt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<SlotZusatzInfo>,
}

impl Slot {
    /// Erstellt einen freien, ungesperrten Slot
    pub fn frei(id: SlotId) -> Self {
        Self {
            id,
            occupier_id: None,
            locked: false,
            occupier_muted: false,
            additional_info: None,
        }
    }

    /// Prueft ob der Slot belegt ist
    pub fn ist_belegt(&self) -> bool {
        self.occupier_id.is_some()
    }
}

/// Anzeige-Daten des Slot-Belegenden
///
/// Wird von Mitglieder-Add/Remove-Events aktualisiert ohne die Belegung
/// selbst anzufassen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotZusatzInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileges: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_state: Option<u8>,
}

// ---------------------------------------------------------------------------
// Stage-Einstellungen
// ---------------------------------------------------------------------------

/// Stage-Konfiguration einer Gruppe (audioConfig der Plattform)
///
/// Einmal fuer eine Operation gelesen bleibt der Snapshot unveraendert;
/// eine Aktualisierung erfolgt nur durch explizites Neuladen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSettings {
    /// Ist die Stage fuer diese Gruppe freigeschaltet?
    pub enabled: bool,
    /// Mindest-Reputationsstufe fuer das Belegen eines Slots
    #[serde(default)]
    pub min_reputation_level: u32,
}

/// Eintrag der plattformweiten Stage-Liste bzw. der aktiven Stages
/// einer Gruppe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    pub id: u32,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Anfragen
// ---------------------------------------------------------------------------

/// Payload fuer STAGE_GROUP_ACTIVE_LIST
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupActiveListRequest {
    pub id: GroupId,
}

/// Payload fuer GROUP_AUDIO_SLOT_LIST
///
/// `subscribe: true` registriert die Gruppe fuer Slot-Push-Events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotListRequest {
    pub id: GroupId,
    pub subscribe: bool,
}

/// Payload fuer GROUP_AUDIO_BROADCAST_UPDATE (Mute-Aenderung)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastUpdateRequest {
    pub id: GroupId,
    pub slot_id: SlotId,
    pub occupier_id: SubscriberId,
    pub occupier_muted: bool,
}

/// Teil-Update eines Slots (nur Sperre, serverseitig gemerged)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotLockUpdate {
    pub id: SlotId,
    pub locked: bool,
}

/// Payload fuer GROUP_AUDIO_SLOT_UPDATE (Sperr-Aenderung)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpdateRequest {
    pub id: GroupId,
    pub slot: SlotLockUpdate,
}

/// Payload fuer GROUP_AUDIO_BROADCAST (Slot belegen, SDP-Offer)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub id: GroupId,
    pub slot_id: SlotId,
    pub sdp: String,
}

/// Payload fuer GROUP_AUDIO_BROADCAST_DISCONNECT (Leave oder Kick)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastDisconnectRequest {
    pub id: GroupId,
    pub slot_id: SlotId,
    pub occupier_id: SubscriberId,
}

// ---------------------------------------------------------------------------
// Antwort-Koerper
// ---------------------------------------------------------------------------

/// Antwort-Koerper einer erfolgreichen GROUP_AUDIO_BROADCAST-Anfrage
///
/// Enthaelt die SDP-Answer des Servers und den nun belegten Slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSlotResponse {
    pub sdp: String,
    pub slot: Slot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_wire_format_ist_camel_case() {
        let slot = Slot {
            id: SlotId(1),
            occupier_id: Some(SubscriberId(1234)),
            locked: false,
            occupier_muted: true,
            additional_info: None,
        };
        let json = serde_json::to_string(&slot).unwrap();
        assert!(json.contains("\"occupierId\":1234"));
        assert!(json.contains("\"occupierMuted\":true"));
    }

    #[test]
    fn slot_mit_fehlenden_feldern_deserialisierbar() {
        // Der Server laesst leere Felder weg; defaults muessen greifen
        let slot: Slot = serde_json::from_str(r#"{"id":3}"#).unwrap();
        assert_eq!(slot.id, SlotId(3));
        assert!(!slot.ist_belegt());
        assert!(!slot.locked);
        assert!(!slot.occupier_muted);
    }

    #[test]
    fn join_antwort_deserialisierbar() {
        let json = r#"{"sdp":"v=0 answer","slot":{"id":1,"occupierId":42}}"#;
        let antwort: JoinSlotResponse = serde_json::from_str(json).unwrap();
        assert_eq!(antwort.sdp, "v=0 answer");
        assert_eq!(antwort.slot.occupier_id, Some(SubscriberId(42)));
    }

    #[test]
    fn broadcast_request_wire_format() {
        let req = BroadcastRequest {
            id: GroupId(100),
            slot_id: SlotId(1),
            sdp: "v=0 offer".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"id\":100"));
        assert!(json.contains("\"slotId\":1"));
    }
}
