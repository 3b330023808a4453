pub mod bias;
pub mod drift;
pub mod host;
pub mod player_trait;
pub mod seek;
pub mod session;
pub mod sim_player;

pub use bias::{BiasAdjustment, BiasController, BiasStore, FileBiasStore, MemoryBiasStore};
pub use drift::{Correction, DriftController, DriftOutcome, DriftPolicy};
pub use host::SessionHost;
pub use player_trait::PlaybackElement;
pub use seek::SeekStabilizer;
pub use session::{Pending, SyncSession};
pub use sim_player::SimulatedPlayer;
