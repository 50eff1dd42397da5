pub mod brand;
pub mod game;
pub mod reward;
pub mod voucher;
pub mod ws;

pub use brand::brand_config;
pub use game::game_config;
pub use reward::reward_config;
pub use voucher::voucher_config;
pub use ws::ws_config;
