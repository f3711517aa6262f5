//! rudel-core – Gemeinsame Typen, Events und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Rudel-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{AufrufKontext, Result, RudelError};
pub use event::RudelEvent;
pub use types::{GroupId, SlotId, SubscriberId};
