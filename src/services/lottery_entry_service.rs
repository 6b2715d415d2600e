use crate::entities::{
    SlotEntryStatus, entry_group_entity as groups, lottery_session_entity as sessions,
    organizer_model_entity as roster, photo_session_entity as photo_sessions,
    slot_entity as slots, slot_entry_entity as entries,
};
use crate::error::{AppError, AppResult};
use crate::models::{EntryGroupResponse, SlotEntryRequest, SubmitEntryRequest};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
};
use std::collections::{HashMap, HashSet};

/// 默认抽选权重。权重由服务端策略（如会员等级）决定，
/// 不接受客户端提交
pub const DEFAULT_LOTTERY_WEIGHT: f64 = 1.0;

#[derive(Clone)]
pub struct LotteryEntryService {
    pool: DatabaseConnection,
}

impl LotteryEntryService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 提交报名（整组）
    ///
    /// 逻辑:
    /// 1. 校验请求形状（非空 / 时段不重复 / 张数非负）
    /// 2. 场次存在、状态 open、报名窗口内
    /// 3. 时段归属 / 容量 / 模特名册校验
    /// 4. 组 + 全部子条目在一个事务内落库
    ///
    /// 已有组时转入修改路径（幂等重入，不会悄悄产生第二个组）。
    /// 并发首次提交撞 (session, user) 唯一约束时重试一次，
    /// 重试会走到修改路径。
    pub async fn submit_entry(
        &self,
        session_id: i64,
        user_id: i64,
        req: &SubmitEntryRequest,
    ) -> AppResult<EntryGroupResponse> {
        validate_entry_shape(&req.entries)?;

        match self.submit_entry_once(session_id, user_id, req).await {
            Err(AppError::DatabaseError(e))
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                self.submit_entry_once(session_id, user_id, req).await
            }
            other => other,
        }
    }

    /// 修改报名（整组替换）
    ///
    /// 要求组已存在、修改次数 < 3、窗口开放、场次未开抽。
    /// 旧子条目整组删除后插入新集合，update_count 递增。
    pub async fn update_entry(
        &self,
        session_id: i64,
        user_id: i64,
        req: &SubmitEntryRequest,
    ) -> AppResult<EntryGroupResponse> {
        validate_entry_shape(&req.entries)?;

        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let (session, photo_session) = self.load_session(&txn, session_id).await?;
        ensure_mutable(&session, now)?;

        let group = groups::Entity::find()
            .filter(groups::Column::LotterySessionId.eq(session_id))
            .filter(groups::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry not found for this session".to_string()))?;

        let response = self
            .replace_group_entries(&txn, &session, &photo_session, group, req, now)
            .await?;

        txn.commit().await?;
        Ok(response)
    }

    /// 查询当前用户在该场次的报名组
    pub async fn get_user_entry(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> AppResult<EntryGroupResponse> {
        let group = groups::Entity::find()
            .filter(groups::Column::LotterySessionId.eq(session_id))
            .filter(groups::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Entry not found for this session".to_string()))?;

        let children = entries::Entity::find()
            .filter(entries::Column::EntryGroupId.eq(group.id))
            .order_by_asc(entries::Column::Id)
            .all(&self.pool)
            .await?;

        Ok(EntryGroupResponse::from_parts(group, children))
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    async fn submit_entry_once(
        &self,
        session_id: i64,
        user_id: i64,
        req: &SubmitEntryRequest,
    ) -> AppResult<EntryGroupResponse> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let (session, photo_session) = self.load_session(&txn, session_id).await?;
        ensure_mutable(&session, now)?;

        let existing = groups::Entity::find()
            .filter(groups::Column::LotterySessionId.eq(session_id))
            .filter(groups::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;

        let response = match existing {
            Some(group) => {
                self.replace_group_entries(&txn, &session, &photo_session, group, req, now)
                    .await?
            }
            None => {
                self.create_group(&txn, &session, &photo_session, user_id, req)
                    .await?
            }
        };

        txn.commit().await?;
        Ok(response)
    }

    async fn load_session(
        &self,
        txn: &DatabaseTransaction,
        session_id: i64,
    ) -> AppResult<(sessions::Model, photo_sessions::Model)> {
        let session = sessions::Entity::find_by_id(session_id)
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lottery session {session_id} not found")))?;

        let photo_session = photo_sessions::Entity::find_by_id(session.photo_session_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "Photo session {} missing for lottery session {session_id}",
                    session.photo_session_id
                ))
            })?;

        Ok((session, photo_session))
    }

    /// 首次提交：建组 + 插入子条目
    async fn create_group(
        &self,
        txn: &DatabaseTransaction,
        session: &sessions::Model,
        photo_session: &photo_sessions::Model,
        user_id: i64,
        req: &SubmitEntryRequest,
    ) -> AppResult<EntryGroupResponse> {
        self.check_slots_and_capacity(txn, session, photo_session, &req.entries, None)
            .await?;
        self.check_model_selection(txn, session, photo_session, &req.entries)
            .await?;

        let group = groups::ActiveModel {
            lottery_session_id: Set(session.id),
            user_id: Set(user_id),
            cancellation_policy: Set(req.cancellation_policy.clone()),
            total_slots_applied: Set(req.entries.len() as i32),
            update_count: Set(0),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let children = self
            .insert_children(txn, session.id, group.id, user_id, &req.entries)
            .await?;

        log::info!(
            "Entry group {} created: session={} user={} slots={}",
            group.id,
            session.id,
            user_id,
            children.len()
        );

        Ok(EntryGroupResponse::from_parts(group, children))
    }

    /// 修改：整组替换子条目并递增 update_count
    async fn replace_group_entries(
        &self,
        txn: &DatabaseTransaction,
        session: &sessions::Model,
        photo_session: &photo_sessions::Model,
        group: groups::Model,
        req: &SubmitEntryRequest,
        now: DateTime<Utc>,
    ) -> AppResult<EntryGroupResponse> {
        if !group.can_revise() {
            return Err(AppError::Conflict(format!(
                "Revision limit exceeded: entry was already updated {} times",
                group.update_count
            )));
        }

        // 容量复查时排除本组已占的名额（自我替换不能把自己卡死）
        self.check_slots_and_capacity(txn, session, photo_session, &req.entries, Some(group.id))
            .await?;
        self.check_model_selection(txn, session, photo_session, &req.entries)
            .await?;

        entries::Entity::delete_many()
            .filter(entries::Column::EntryGroupId.eq(group.id))
            .exec(txn)
            .await?;

        let group_id = group.id;
        let user_id = group.user_id;
        let update_count = group.update_count;

        let mut am = group.into_active_model();
        am.cancellation_policy = Set(req.cancellation_policy.clone());
        am.total_slots_applied = Set(req.entries.len() as i32);
        am.update_count = Set(update_count + 1);
        am.updated_at = Set(Some(now));
        let updated = am.update(txn).await?;

        let children = self
            .insert_children(txn, session.id, group_id, user_id, &req.entries)
            .await?;

        log::info!(
            "Entry group {group_id} revised: session={} user={user_id} update_count={}",
            session.id,
            update_count + 1
        );

        Ok(EntryGroupResponse::from_parts(updated, children))
    }

    /// 时段归属与容量校验
    ///
    /// 请求涉及的时段行先加排他锁（FOR UPDATE），
    /// 并发提交对同一时段的 check-then-act 由此串行化，
    /// 不会合谋冲破 max_entries
    async fn check_slots_and_capacity(
        &self,
        txn: &DatabaseTransaction,
        session: &sessions::Model,
        photo_session: &photo_sessions::Model,
        requested: &[SlotEntryRequest],
        exclude_group_id: Option<i64>,
    ) -> AppResult<()> {
        let slot_ids: Vec<i64> = requested.iter().map(|e| e.slot_id).collect();

        let slot_rows = slots::Entity::find()
            .filter(slots::Column::PhotoSessionId.eq(photo_session.id))
            .filter(slots::Column::Id.is_in(slot_ids))
            .lock_exclusive()
            .all(txn)
            .await?;

        let slot_map: HashMap<i64, &slots::Model> =
            slot_rows.iter().map(|s| (s.id, s)).collect();

        for e in requested {
            if !slot_map.contains_key(&e.slot_id) {
                return Err(AppError::NotFound(format!(
                    "Slot {} not found in this photo session",
                    e.slot_id
                )));
            }
        }

        let Some(cap) = session.max_entries else {
            return Ok(());
        };

        for e in requested {
            let slot = slot_map[&e.slot_id];

            let mut query = entries::Entity::find()
                .filter(entries::Column::LotterySessionId.eq(session.id))
                .filter(entries::Column::SlotId.eq(e.slot_id))
                .filter(entries::Column::Status.eq(SlotEntryStatus::Entered));
            if let Some(gid) = exclude_group_id {
                query = query.filter(entries::Column::EntryGroupId.ne(gid));
            }
            let current = query.count(txn).await? as i64;

            if current + 1 > cap as i64 {
                return Err(AppError::Conflict(format!(
                    "Slot {} is at capacity",
                    slot.slot_number
                )));
            }
        }

        Ok(())
    }

    /// 模特指定校验：指定的模特必须在主办方名册中且在职
    async fn check_model_selection(
        &self,
        txn: &DatabaseTransaction,
        session: &sessions::Model,
        photo_session: &photo_sessions::Model,
        requested: &[SlotEntryRequest],
    ) -> AppResult<()> {
        let wanted: HashSet<i64> = requested
            .iter()
            .filter_map(|e| e.preferred_model_id)
            .collect();

        if wanted.is_empty() {
            return Ok(());
        }

        if !session.enable_model_selection {
            return Err(AppError::ValidationError(
                "Model selection is not enabled for this lottery session".to_string(),
            ));
        }

        let active: HashSet<i64> = roster::Entity::find()
            .filter(roster::Column::OrganizerId.eq(photo_session.organizer_id))
            .filter(roster::Column::Id.is_in(wanted.iter().copied().collect::<Vec<_>>()))
            .filter(roster::Column::IsActive.eq(true))
            .all(txn)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        for id in &wanted {
            if !active.contains(id) {
                return Err(AppError::IntegrityError(format!(
                    "Model {id} is not an active member of this organizer's roster"
                )));
            }
        }

        Ok(())
    }

    async fn insert_children(
        &self,
        txn: &DatabaseTransaction,
        session_id: i64,
        group_id: i64,
        user_id: i64,
        requested: &[SlotEntryRequest],
    ) -> AppResult<Vec<entries::Model>> {
        let models: Vec<entries::ActiveModel> = requested
            .iter()
            .map(|e| entries::ActiveModel {
                lottery_session_id: Set(session_id),
                entry_group_id: Set(group_id),
                slot_id: Set(e.slot_id),
                user_id: Set(user_id),
                preferred_model_id: Set(e.preferred_model_id),
                cheki_unsigned_count: Set(e.cheki_unsigned_count),
                cheki_signed_count: Set(e.cheki_signed_count),
                lottery_weight: Set(DEFAULT_LOTTERY_WEIGHT),
                status: Set(SlotEntryStatus::Entered),
                ..Default::default()
            })
            .collect();

        entries::Entity::insert_many(models).exec(txn).await?;

        let children = entries::Entity::find()
            .filter(entries::Column::EntryGroupId.eq(group_id))
            .order_by_asc(entries::Column::Id)
            .all(txn)
            .await?;

        Ok(children)
    }
}

/// 请求形状校验（纯函数，不触库）
fn validate_entry_shape(requested: &[SlotEntryRequest]) -> AppResult<()> {
    if requested.is_empty() {
        return Err(AppError::ValidationError(
            "At least one slot entry is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for e in requested {
        if !seen.insert(e.slot_id) {
            return Err(AppError::ValidationError(format!(
                "Duplicate entry for slot {}",
                e.slot_id
            )));
        }
        if e.cheki_unsigned_count < 0 || e.cheki_signed_count < 0 {
            return Err(AppError::ValidationError(
                "Cheki counts must be non-negative".to_string(),
            ));
        }
    }

    Ok(())
}

/// 场次必须为 open 且在报名窗口内才接受提交 / 修改
fn ensure_mutable(session: &sessions::Model, now: DateTime<Utc>) -> AppResult<()> {
    use crate::entities::LotterySessionStatus;

    if session.status != LotterySessionStatus::Open {
        return Err(AppError::Conflict(format!(
            "Lottery session {} is {} and no longer accepts entries",
            session.id, session.status
        )));
    }
    if !session.entry_window_open(now) {
        return Err(AppError::ValidationError(
            "Entry window is closed".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LotterySessionStatus;
    use chrono::TimeZone;

    fn entry(slot_id: i64) -> SlotEntryRequest {
        SlotEntryRequest {
            slot_id,
            preferred_model_id: None,
            cheki_unsigned_count: 1,
            cheki_signed_count: 0,
        }
    }

    #[test]
    fn test_shape_rejects_empty() {
        assert!(validate_entry_shape(&[]).is_err());
    }

    #[test]
    fn test_shape_rejects_duplicate_slots() {
        let result = validate_entry_shape(&[entry(1), entry(2), entry(1)]);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_shape_rejects_negative_cheki_counts() {
        let mut bad = entry(1);
        bad.cheki_signed_count = -1;
        assert!(validate_entry_shape(&[bad]).is_err());
    }

    #[test]
    fn test_shape_accepts_valid_request() {
        assert!(validate_entry_shape(&[entry(1), entry(2)]).is_ok());
    }

    fn session(status: LotterySessionStatus) -> sessions::Model {
        sessions::Model {
            id: 1,
            photo_session_id: 1,
            entry_start_time: Utc.with_ymd_and_hms(2026, 1, 10, 10, 0, 0).unwrap(),
            entry_end_time: Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap(),
            max_entries: None,
            enable_model_selection: false,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_mutation_rejected_outside_window() {
        let s = session(LotterySessionStatus::Open);
        let late = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        assert!(matches!(
            ensure_mutable(&s, late),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_mutation_rejected_after_draw_started() {
        let s = session(LotterySessionStatus::Drawing);
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 11, 0, 0).unwrap();
        assert!(matches!(
            ensure_mutable(&s, now),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_mutation_allowed_in_window() {
        let s = session(LotterySessionStatus::Open);
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 11, 0, 0).unwrap();
        assert!(ensure_mutable(&s, now).is_ok());
    }
}
