pub mod notification;
pub mod pipeline;
