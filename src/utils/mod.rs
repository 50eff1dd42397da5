pub mod clock;
pub mod money;
pub mod rng;

pub use clock::*;
pub use money::*;
pub use rng::*;
