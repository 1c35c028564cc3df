pub mod gapit;
pub mod message;
pub mod value;

pub use gapit::{GapitCode, Group, Member, ReadPriority};
pub use message::InboundMessage;
pub use value::MetricValue;
