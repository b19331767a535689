//! Pipeline records and their stage-table encodings

pub mod assignment;
pub mod delivery;
pub mod flag;
pub mod link_stat;
pub mod subject;

pub use assignment::{Assignment, Shortlink, Treatment, SHORTLINK_FAILURE};
pub use delivery::{BroadcastResult, DeliveryResult};
pub use link_stat::LinkStat;
pub use subject::{Subject, SubjectId, SubjectTable, PHONE_HEADER};
