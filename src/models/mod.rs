//! Domain types shared across the engine.

pub mod course;
pub mod notification;
pub mod session;
pub mod subscriber;

pub use course::{parse_course_label, CourseLabel};
pub use notification::{NotificationKind, NotificationRecord};
pub use session::CourseStatus;
pub use subscriber::{CourseSubscription, Subscriber};
