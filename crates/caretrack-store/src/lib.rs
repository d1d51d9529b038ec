pub mod db;
pub mod error;
pub mod memory;
pub mod ports;
pub mod seed;
pub mod sqlite;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use ports::{
    AttendanceStore, AuthClientStore, CaregiverStore, LogQuery, RequestLogStore, ScheduleQuery,
    ScheduleStore, TaskStore,
};
pub use sqlite::SqliteStore;
