mod device;
mod event;
mod growth;
mod record;

pub use device::Device;
pub use event::{Event, EventKind};
pub use growth::{GrowthCategory, GrowthData};
pub use record::SyncRecord;
