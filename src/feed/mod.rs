//! Swipe feed: listing ready profiles and the traversal state machine.

pub mod routes;
pub mod session;

pub use routes::feed_routes;
pub use session::{
    CallPhase, Decision, FeedError, FeedSession, PendingSwipe, Progress, SWIPE_DELAY,
    SwipeDirection,
};
