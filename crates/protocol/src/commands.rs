//! Kommando-Namen des Plattformprotokolls
//!
//! Die Plattform spricht ein Request/Response-Protokoll ueber eine
//! persistente Socket-Verbindung; jedes Kommando wird ueber seinen
//! SCREAMING_SNAKE_CASE-Namen adressiert. Hier sind nur die Kommandos
//! des Stage-Subsystems definiert.

use serde::{Deserialize, Serialize};

/// Stage-Kommandos die das SDK an den Server sendet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Plattformweite Liste der Stage-Themen
    StageList,
    /// Aktive Stages einer Gruppe
    StageGroupActiveList,
    /// Slot-Belegung einer Gruppe abrufen (mit Push-Abo)
    GroupAudioSlotList,
    /// Mute-Zustand eines belegten Slots aendern
    GroupAudioBroadcastUpdate,
    /// Slot-Eigenschaften aendern (Sperre)
    GroupAudioSlotUpdate,
    /// Slot belegen und SDP-Verhandlung starten
    GroupAudioBroadcast,
    /// Belegung eines Slots beenden (Leave oder Kick)
    GroupAudioBroadcastDisconnect,
}

impl Command {
    /// Gibt den Wire-Namen des Kommandos zurueck
    pub fn name(&self) -> &'static str {
        match self {
            Self::StageList => "STAGE_LIST",
            Self::StageGroupActiveList => "STAGE_GROUP_ACTIVE_LIST",
            Self::GroupAudioSlotList => "GROUP_AUDIO_SLOT_LIST",
            Self::GroupAudioBroadcastUpdate => "GROUP_AUDIO_BROADCAST_UPDATE",
            Self::GroupAudioSlotUpdate => "GROUP_AUDIO_SLOT_UPDATE",
            Self::GroupAudioBroadcast => "GROUP_AUDIO_BROADCAST",
            Self::GroupAudioBroadcastDisconnect => "GROUP_AUDIO_BROADCAST_DISCONNECT",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
