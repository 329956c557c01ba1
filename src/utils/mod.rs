pub mod math;
pub mod memo;
