pub mod ai;
pub mod notification;

pub use ai::{AiFuture, ClassifierPort, LlmPort, TranscriberPort};
pub use notification::{NotificationError, NotificationFuture, SosNotifier};
