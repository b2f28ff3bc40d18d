pub mod http;
pub mod notification;
