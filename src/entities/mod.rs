pub mod brands;
pub mod game_brand_links;
pub mod games;
pub mod reward_transactions;
pub mod users;
pub mod vouchers;

pub use brands as brand_entity;
pub use game_brand_links as game_brand_link_entity;
pub use games as game_entity;
pub use reward_transactions as reward_transaction_entity;
pub use users as user_entity;
pub use vouchers as voucher_entity;
