pub mod chart;
pub mod mode;
pub mod request;
pub mod rotation;
pub mod score;
pub mod session;
pub mod status;

pub use chart::{Segment, bar_height, layout_segments, tooltip_on_left};
pub use mode::{FreeTextMeta, PromptMode, SubmitBlock, TestingDraft};
pub use request::{Debouncer, REGENERATE_QUIET_PERIOD, RequestTicket, RequestTracker};
pub use rotation::RotationCursor;
pub use score::{DragOrigin, SCORE_0_TO_10, SCORE_0_TO_100_BY_10, ScoreInput, ScoreRange};
pub use session::{LaunchKind, SessionStore};
pub use status::{FieldFlash, StatusKind, StatusLine};
