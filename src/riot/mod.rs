mod cache;
pub mod types;

pub use cache::schema;
pub use types::{MatchDetail, Participant, ParticipantIdentity, ParticipantStats, Player, Summoner};
