//! Task history: the estimated tasks a team has recorded, used as training
//! data for the local classifier.

pub mod models;
pub mod store;

pub use models::{NewTask, Task};
pub use store::TaskStore;
