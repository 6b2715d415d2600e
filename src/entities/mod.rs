pub mod bookings;
pub mod entry_groups;
pub mod lottery_sessions;
pub mod organizer_models;
pub mod photo_sessions;
pub mod slot_entries;
pub mod slots;
pub mod users;

pub use bookings as booking_entity;
pub use entry_groups as entry_group_entity;
pub use lottery_sessions as lottery_session_entity;
pub use organizer_models as organizer_model_entity;
pub use photo_sessions as photo_session_entity;
pub use slot_entries as slot_entry_entity;
pub use slots as slot_entity;
pub use users as user_entity;

pub use entry_groups::CancellationPolicy;
pub use entry_groups::EntryGroupStatus;
pub use lottery_sessions::LotterySessionStatus;
pub use slot_entries::SlotEntryStatus;
