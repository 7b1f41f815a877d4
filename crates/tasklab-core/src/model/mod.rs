pub mod item;
pub mod payload;
pub mod record;
pub mod value;
pub mod work_item;

pub use item::{ParseEnumError, Priority, Status, WorkItemKind};
pub use payload::{CreatePayload, UpdatePayload};
pub use record::WorkItemRecord;
pub use value::{FieldValue, TIMESTAMP_FORMAT, format_timestamp, parse_datetime};
pub use work_item::WorkItem;
