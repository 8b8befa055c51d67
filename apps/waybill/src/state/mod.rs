//! # State Module
//!
//! In-process state owned by the application context.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────┐        ┌──────────────────────────────┐  │
//! │  │  MasterDataBroadcaster   │◄───────│  EditSession (one per form)  │  │
//! │  │                          │ sub-   │                              │  │
//! │  │  Arc<RwLock<Registry>>   │ scribe │  DraftState + DraftData      │  │
//! │  │  one per process         │        │  Subscription guard          │  │
//! │  └──────────────────────────┘        └──────────────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Broadcaster: clones share one registry behind an RwLock             │
//! │  • EditSession: owned by one caller, mutated through &mut self         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod broadcaster;
mod session;

pub use broadcaster::{MasterDataBroadcaster, MasterDataCallback, Subscription, SubscriptionId};
pub use session::EditSession;
