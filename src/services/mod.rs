pub mod aggregator;
pub mod brand_service;
pub mod broadcaster;
pub mod game_service;
pub mod reward_service;
pub mod user_service;
pub mod voucher_service;

pub use aggregator::*;
pub use brand_service::*;
pub use broadcaster::*;
pub use game_service::*;
pub use reward_service::*;
pub use user_service::*;
pub use voucher_service::*;
