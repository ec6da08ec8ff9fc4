// ABOUTME: Promotion orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Promotion struct, the controller, lock and history.

mod controller;
mod error;
mod history;
mod lock;
mod machine;
mod record;
mod state;
mod transitions;

pub use controller::PromotionController;
pub use error::{PromotionError, PromotionErrorKind};
pub use history::PromotionHistory;
pub use lock::{LockInfo, PromotionLock};
pub use machine::{Promotion, StageContext};
pub use record::{Outcome, PromotionRecord, Stage};
pub use state::{Completed, CutOver, IdleDeployed, Resolved, SmokeTested};
pub use transitions::TransitionResult;
