pub mod apply;
pub mod membership;
