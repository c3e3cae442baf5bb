pub mod error;
pub mod hunter;
pub mod tools;

pub use error::HunterError;
pub use hunter::{HuntStage, PacketHunter, RunReport};
