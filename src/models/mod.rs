pub mod record;
pub mod status;
pub mod summary;

pub use record::TestRecord;
pub use status::TestStatus;
pub use summary::Summary;
