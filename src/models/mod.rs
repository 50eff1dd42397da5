pub mod brand;
pub mod common;
pub mod game;
pub mod pagination;
pub mod reward;
pub mod voucher;

pub use brand::*;
pub use common::*;
pub use game::*;
pub use pagination::*;
pub use reward::*;
pub use voucher::*;
