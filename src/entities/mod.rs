pub mod goal;
pub mod goal_task;
pub mod progress_entry;
pub mod task;
