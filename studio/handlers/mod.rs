pub mod charts;
pub mod home;
pub mod train;
pub mod train_sse;
