pub mod history_sweeper;
pub mod notification_processor;
