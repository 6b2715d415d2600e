use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Nickname,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PhotoSessions {
    Table,
    Id,
    OrganizerId,
    Title,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Slots {
    Table,
    Id,
    PhotoSessionId,
    SlotNumber,
    MaxParticipants,
    CreatedAt,
}

#[derive(DeriveIden)]
enum LotterySessions {
    Table,
    Id,
    PhotoSessionId,
    EntryStartTime,
    EntryEndTime,
    MaxEntries,
    EnableModelSelection,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EntryGroups {
    Table,
    Id,
    LotterySessionId,
    UserId,
    CancellationPolicy,
    TotalSlotsApplied,
    UpdateCount,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SlotEntries {
    Table,
    Id,
    LotterySessionId,
    EntryGroupId,
    SlotId,
    UserId,
    PreferredModelId,
    ChekiUnsignedCount,
    ChekiSignedCount,
    LotteryWeight,
    Status,
    WonAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrganizerModels {
    Table,
    Id,
    OrganizerId,
    ModelName,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    LotterySessionId,
    SlotId,
    SlotEntryId,
    UserId,
    ChekiUnsignedCount,
    ChekiSignedCount,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

fn id_col(name: impl IntoIden) -> ColumnDef {
    let mut col = ColumnDef::new(name);
    col.big_integer().not_null().auto_increment().primary_key();
    col
}

fn created_at_col(name: impl IntoIden) -> ColumnDef {
    let mut col = ColumnDef::new(name);
    col.timestamp_with_time_zone()
        .default(Expr::cust("NOW()"))
        .null();
    col
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Postgres ENUM types
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("lottery_session_status"))
                    .values(vec![
                        Alias::new("open"),
                        Alias::new("drawing"),
                        Alias::new("completed"),
                        Alias::new("closed"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("cancellation_policy"))
                    .values(vec![Alias::new("all_or_nothing"), Alias::new("partial_ok")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("entry_group_status"))
                    .values(vec![Alias::new("active"), Alias::new("frozen")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("slot_entry_status"))
                    .values(vec![
                        Alias::new("entered"),
                        Alias::new("won"),
                        Alias::new("lost"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(&mut id_col(Users::Id))
                    .col(ColumnDef::new(Users::Nickname).string().not_null())
                    .col(&mut created_at_col(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PhotoSessions::Table)
                    .if_not_exists()
                    .col(&mut id_col(PhotoSessions::Id))
                    .col(
                        ColumnDef::new(PhotoSessions::OrganizerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PhotoSessions::Title).string().not_null())
                    .col(&mut created_at_col(PhotoSessions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photo_sessions_organizer")
                            .from(PhotoSessions::Table, PhotoSessions::OrganizerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Slots::Table)
                    .if_not_exists()
                    .col(&mut id_col(Slots::Id))
                    .col(
                        ColumnDef::new(Slots::PhotoSessionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Slots::SlotNumber).integer().not_null())
                    .col(ColumnDef::new(Slots::MaxParticipants).integer().not_null())
                    .col(&mut created_at_col(Slots::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slots_photo_session")
                            .from(Slots::Table, Slots::PhotoSessionId)
                            .to(PhotoSessions::Table, PhotoSessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // unique (photo_session_id, slot_number)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_slots_session_number")
                    .table(Slots::Table)
                    .col(Slots::PhotoSessionId)
                    .col(Slots::SlotNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LotterySessions::Table)
                    .if_not_exists()
                    .col(&mut id_col(LotterySessions::Id))
                    .col(
                        ColumnDef::new(LotterySessions::PhotoSessionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotterySessions::EntryStartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotterySessions::EntryEndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LotterySessions::MaxEntries).integer().null())
                    .col(
                        ColumnDef::new(LotterySessions::EnableModelSelection)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LotterySessions::Status)
                            .custom(Alias::new("lottery_session_status"))
                            .not_null()
                            .default("open"),
                    )
                    .col(&mut created_at_col(LotterySessions::CreatedAt))
                    .col(
                        ColumnDef::new(LotterySessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lottery_sessions_photo_session")
                            .from(LotterySessions::Table, LotterySessions::PhotoSessionId)
                            .to(PhotoSessions::Table, PhotoSessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EntryGroups::Table)
                    .if_not_exists()
                    .col(&mut id_col(EntryGroups::Id))
                    .col(
                        ColumnDef::new(EntryGroups::LotterySessionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EntryGroups::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(EntryGroups::CancellationPolicy)
                            .custom(Alias::new("cancellation_policy"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EntryGroups::TotalSlotsApplied)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EntryGroups::UpdateCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EntryGroups::Status)
                            .custom(Alias::new("entry_group_status"))
                            .not_null()
                            .default("active"),
                    )
                    .col(&mut created_at_col(EntryGroups::CreatedAt))
                    .col(
                        ColumnDef::new(EntryGroups::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_entry_groups_lottery_session")
                            .from(EntryGroups::Table, EntryGroups::LotterySessionId)
                            .to(LotterySessions::Table, LotterySessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // unique (lottery_session_id, user_id) - one group per user per session
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_entry_groups_session_user")
                    .table(EntryGroups::Table)
                    .col(EntryGroups::LotterySessionId)
                    .col(EntryGroups::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SlotEntries::Table)
                    .if_not_exists()
                    .col(&mut id_col(SlotEntries::Id))
                    .col(
                        ColumnDef::new(SlotEntries::LotterySessionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SlotEntries::EntryGroupId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SlotEntries::SlotId).big_integer().not_null())
                    .col(ColumnDef::new(SlotEntries::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(SlotEntries::PreferredModelId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SlotEntries::ChekiUnsignedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SlotEntries::ChekiSignedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SlotEntries::LotteryWeight)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(SlotEntries::Status)
                            .custom(Alias::new("slot_entry_status"))
                            .not_null()
                            .default("entered"),
                    )
                    .col(
                        ColumnDef::new(SlotEntries::WonAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(&mut created_at_col(SlotEntries::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slot_entries_entry_group")
                            .from(SlotEntries::Table, SlotEntries::EntryGroupId)
                            .to(EntryGroups::Table, EntryGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_slot_entries_slot")
                            .from(SlotEntries::Table, SlotEntries::SlotId)
                            .to(Slots::Table, Slots::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一组内同一时段只能报一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_slot_entries_group_slot")
                    .table(SlotEntries::Table)
                    .col(SlotEntries::EntryGroupId)
                    .col(SlotEntries::SlotId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 抽选与容量检查按时段扫描
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_slot_entries_session_slot_status")
                    .table(SlotEntries::Table)
                    .col(SlotEntries::LotterySessionId)
                    .col(SlotEntries::SlotId)
                    .col(SlotEntries::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizerModels::Table)
                    .if_not_exists()
                    .col(&mut id_col(OrganizerModels::Id))
                    .col(
                        ColumnDef::new(OrganizerModels::OrganizerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizerModels::ModelName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizerModels::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(&mut created_at_col(OrganizerModels::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_organizer_models_organizer")
                            .from(OrganizerModels::Table, OrganizerModels::OrganizerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(&mut id_col(Bookings::Id))
                    .col(
                        ColumnDef::new(Bookings::LotterySessionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::SlotId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::SlotEntryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::ChekiUnsignedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::ChekiSignedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(&mut created_at_col(Bookings::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_slot_entry")
                            .from(Bookings::Table, Bookings::SlotEntryId)
                            .to(SlotEntries::Table, SlotEntries::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个中签条目至多一条预约（重复 materialize 幂等）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_bookings_slot_entry")
                    .table(Bookings::Table)
                    .col(Bookings::SlotEntryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrganizerModels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SlotEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EntryGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LotterySessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Slots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PhotoSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
