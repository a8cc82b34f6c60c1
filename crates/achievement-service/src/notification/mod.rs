//! 通知模块
//!
//! 成就解锁与徽章晋级时向用户发送通知。

pub mod channels;
pub mod sender;
pub mod service;
pub mod types;

pub use channels::{LogChannel, NotificationChannel, QueueChannel};
pub use sender::NotificationSender;
pub use service::NotificationService;
pub use types::{ChannelResult, Notification, NotificationBuilder, NotificationResult, NotificationType};
