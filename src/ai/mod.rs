//! 电脑对手。

pub mod random;

pub use random::RandomSelector;
