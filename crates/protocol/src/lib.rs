//! rudel-protocol – Plattformprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen, Kommandos und Strukturen
//! die das Stage-Subsystem mit dem Plattform-Server austauscht, sowie die
//! Transport-Schnittstelle [`SignalingChannel`].

pub mod channel;
pub mod commands;
pub mod push;
pub mod response;
pub mod stage;

pub use channel::SignalingChannel;
pub use commands::Command;
pub use push::{CountUpdatePush, MemberUpdatePush, PushEvent, SlotUpdatePush};
pub use response::RpcResponse;
pub use stage::{
    BroadcastDisconnectRequest, BroadcastRequest, BroadcastUpdateRequest, GroupActiveListRequest,
    JoinSlotResponse, Slot, SlotListRequest, SlotLockUpdate, SlotUpdateRequest, SlotZusatzInfo,
    StageInfo, StageSettings,
};
