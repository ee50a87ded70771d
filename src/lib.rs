pub mod core;
pub mod synthesis;
pub mod perception;
pub mod bench;
