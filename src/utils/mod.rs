pub mod jwt;
pub mod weighted_sampling;

pub use jwt::*;
pub use weighted_sampling::draw_winners;
