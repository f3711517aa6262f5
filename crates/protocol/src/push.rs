//! Server-Push-Ereignisse des Stage-Subsystems
//!
//! Die Plattform liefert Push-Ereignisse pro Gruppe in Empfangsreihenfolge
//! (FIFO garantiert der Transport). Das Stage-Subsystem abonniert sie
//! einmal beim Aufbau und verteilt sie anhand der Gruppen-ID an die
//! zugehoerige Session.

use crate::stage::Slot;
use rudel_core::types::{GroupId, SubscriberId};
use serde::{Deserialize, Serialize};

/// Slot-Aenderung einer Gruppe (groupAudioSlotUpdate)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpdatePush {
    /// Gruppe deren Slot sich geaendert hat
    pub id: GroupId,
    /// Neuer Slot-Zustand (vollstaendig, ersetzt die Felder des alten)
    pub slot: Slot,
    /// Ausloeser der Aenderung (bei Disconnects: wer getrennt hat)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_subscriber_id: Option<SubscriberId>,
}

/// Aenderung der Hoererzahl einer Gruppe (groupAudioCountUpdate)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountUpdatePush {
    pub id: GroupId,
    pub count: u32,
}

/// Mitglieder-Aenderung die Anzeige-Daten eines Belegenden beruehrt
///
/// Aendert nie die Belegung selbst, nur `additional_info` des Slots den
/// der Subscriber gerade haelt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdatePush {
    pub id: GroupId,
    pub subscriber_id: SubscriberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileges: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_state: Option<u8>,
}

/// Alle Push-Ereignisse die das Stage-Subsystem konsumiert
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushEvent {
    GroupAudioSlotUpdate(SlotUpdatePush),
    GroupAudioCountUpdate(CountUpdatePush),
    GroupMemberUpdate(MemberUpdatePush),
}
