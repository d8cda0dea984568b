mod clock;
mod player;
mod queue;
mod shared;

pub use clock::PlaybackClock;
pub use player::{Player, PlayerState};
pub use queue::{Queue, QueueId, QueueItem};
pub use shared::SharedPlayer;
