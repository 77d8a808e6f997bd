pub mod day;
pub mod session;
pub mod task;
pub mod week;
