pub mod grid;

pub use grid::{load_arc_task, load_challenges, ArcTask};
