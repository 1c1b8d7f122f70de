pub mod countdown;
pub mod task_ops;
pub mod view;
