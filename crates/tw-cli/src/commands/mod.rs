pub mod dispatch;
pub mod purge;
pub mod queue;
pub mod run;
pub mod trends;
