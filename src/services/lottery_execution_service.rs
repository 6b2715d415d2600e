use crate::entities::{
    CancellationPolicy, EntryGroupStatus, LotterySessionStatus, SlotEntryStatus,
    booking_entity as bookings, entry_group_entity as groups,
    lottery_session_entity as sessions, photo_session_entity as photo_sessions,
    slot_entity as slots, slot_entry_entity as entries,
};
use crate::error::{AppError, AppResult};
use crate::models::{ExecuteLotteryResponse, MaterializeWinnersResponse};
use crate::utils::draw_winners;
use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::collections::HashMap;

#[derive(Clone)]
pub struct LotteryExecutionService {
    pool: DatabaseConnection,
}

impl LotteryExecutionService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 执行抽选（主办方专用，每场次仅一次）
    ///
    /// 逻辑:
    /// 1. 主办方身份校验
    /// 2. 状态条件更新 open -> drawing（CAS）作为唯一准入口，
    ///    并发第二次调用会被拒绝而不是重抽
    /// 3. 逐时段按权重不放回抽取 min(max_participants, 报名数) 名，
    ///    中签置 won + won_at，其余置 lost
    /// 4. 冻结全部报名组，场次置 completed
    ///
    /// 整个抽选在一个事务内：要么全部时段落库，要么一个都不落
    /// （失败回滚后状态仍是 open）。
    pub async fn execute_lottery(
        &self,
        session_id: i64,
        caller_user_id: i64,
    ) -> AppResult<ExecuteLotteryResponse> {
        let txn = self.pool.begin().await?;
        let now = Utc::now();

        let (session, photo_session) = load_session(&txn, session_id).await?;
        ensure_organizer(&photo_session, caller_user_id)?;

        // 准入 CAS：并发调用只有一个能把 open 翻成 drawing
        let cas = sessions::Entity::update_many()
            .col_expr(
                sessions::Column::Status,
                LotterySessionStatus::Drawing.as_enum(),
            )
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::Id.eq(session_id))
            .filter(sessions::Column::Status.eq(LotterySessionStatus::Open))
            .exec(&txn)
            .await?;

        if cas.rows_affected != 1 {
            return Err(AppError::Conflict(format!(
                "Lottery session {session_id} was already executed or is being drawn ({})",
                session.status
            )));
        }

        let slot_rows = slots::Entity::find()
            .filter(slots::Column::PhotoSessionId.eq(photo_session.id))
            .order_by_asc(slots::Column::SlotNumber)
            .all(&txn)
            .await?;

        let entered = entries::Entity::find()
            .filter(entries::Column::LotterySessionId.eq(session_id))
            .filter(entries::Column::Status.eq(SlotEntryStatus::Entered))
            .all(&txn)
            .await?;

        let total_entries = entered.len() as i64;

        let mut by_slot: HashMap<i64, Vec<(i64, f64)>> = HashMap::new();
        for e in &entered {
            by_slot
                .entry(e.slot_id)
                .or_default()
                .push((e.id, e.lottery_weight));
        }

        let mut rng = rand::thread_rng();
        let mut total_winners = 0i64;

        for slot in &slot_rows {
            let Some(candidates) = by_slot.get(&slot.id) else {
                continue;
            };

            let seats = slot.max_participants.max(0) as usize;
            let (winner_ids, loser_ids) = split_winners(candidates, seats, &mut rng);

            if !winner_ids.is_empty() {
                entries::Entity::update_many()
                    .col_expr(entries::Column::Status, SlotEntryStatus::Won.as_enum())
                    .col_expr(entries::Column::WonAt, Expr::value(now))
                    .filter(entries::Column::Id.is_in(winner_ids.clone()))
                    .exec(&txn)
                    .await?;
            }
            if !loser_ids.is_empty() {
                entries::Entity::update_many()
                    .col_expr(entries::Column::Status, SlotEntryStatus::Lost.as_enum())
                    .filter(entries::Column::Id.is_in(loser_ids))
                    .exec(&txn)
                    .await?;
            }

            log::info!(
                "Slot {} drawn: {} winners of {} entries (seats={})",
                slot.slot_number,
                winner_ids.len(),
                candidates.len(),
                seats
            );
            total_winners += winner_ids.len() as i64;
        }

        // 报名组冻结，之后不再接受任何修改
        groups::Entity::update_many()
            .col_expr(groups::Column::Status, EntryGroupStatus::Frozen.as_enum())
            .col_expr(groups::Column::UpdatedAt, Expr::value(now))
            .filter(groups::Column::LotterySessionId.eq(session_id))
            .exec(&txn)
            .await?;

        sessions::Entity::update_many()
            .col_expr(
                sessions::Column::Status,
                LotterySessionStatus::Completed.as_enum(),
            )
            .col_expr(sessions::Column::UpdatedAt, Expr::value(now))
            .filter(sessions::Column::Id.eq(session_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        log::info!(
            "Lottery session {session_id} completed: {total_winners} winners / {total_entries} entries"
        );

        Ok(ExecuteLotteryResponse {
            total_winners,
            total_entries,
        })
    }

    /// 物化中签结果为预约（主办方专用，抽选完成后）
    ///
    /// - all_or_nothing: 组内全部中签才生成预约；有落选则整组作废
    ///   （中签条目保留 won 仅作审计，不生成预约也不让位重抽）
    /// - partial_ok: 每个中签条目各自生成预约
    ///
    /// 单条预约失败只记日志并跳过，不中断整批。
    /// slot_entry_id 唯一约束保证重复调用幂等。
    pub async fn materialize_winners(
        &self,
        session_id: i64,
        caller_user_id: i64,
    ) -> AppResult<MaterializeWinnersResponse> {
        let (session, photo_session) = load_session(&self.pool, session_id).await?;
        ensure_organizer(&photo_session, caller_user_id)?;

        if session.status != LotterySessionStatus::Completed {
            return Err(AppError::Conflict(format!(
                "Lottery session {session_id} is {}; winners can only be materialized after the draw",
                session.status
            )));
        }

        let group_rows = groups::Entity::find()
            .filter(groups::Column::LotterySessionId.eq(session_id))
            .all(&self.pool)
            .await?;

        let won = entries::Entity::find()
            .filter(entries::Column::LotterySessionId.eq(session_id))
            .filter(entries::Column::Status.eq(SlotEntryStatus::Won))
            .order_by_asc(entries::Column::Id)
            .all(&self.pool)
            .await?;

        let mut won_by_group: HashMap<i64, Vec<&entries::Model>> = HashMap::new();
        for e in &won {
            won_by_group.entry(e.entry_group_id).or_default().push(e);
        }

        let mut bookings_created = 0i64;

        for group in &group_rows {
            let Some(group_won) = won_by_group.get(&group.id) else {
                continue;
            };

            if !booking_eligible(
                &group.cancellation_policy,
                group.total_slots_applied,
                group_won.len(),
            ) {
                // 作废的中签仅作审计记录
                log::info!(
                    "Group {} voided: all_or_nothing with {}/{} slots won",
                    group.id,
                    group_won.len(),
                    group.total_slots_applied
                );
                continue;
            }

            for entry in group_won {
                let result = bookings::ActiveModel {
                    lottery_session_id: Set(session_id),
                    slot_id: Set(entry.slot_id),
                    slot_entry_id: Set(entry.id),
                    user_id: Set(entry.user_id),
                    cheki_unsigned_count: Set(entry.cheki_unsigned_count),
                    cheki_signed_count: Set(entry.cheki_signed_count),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await;

                match result {
                    Ok(_) => bookings_created += 1,
                    Err(e)
                        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                    {
                        // 此前已物化过，跳过
                        log::debug!("Booking for slot entry {} already exists", entry.id);
                    }
                    Err(e) => {
                        log::error!(
                            "Failed to create booking for slot entry {} (group {}): {e}",
                            entry.id,
                            group.id
                        );
                    }
                }
            }
        }

        log::info!(
            "Materialized {bookings_created} bookings for lottery session {session_id}"
        );

        Ok(MaterializeWinnersResponse { bookings_created })
    }
}

async fn load_session<C: ConnectionTrait>(
    conn: &C,
    session_id: i64,
) -> AppResult<(sessions::Model, photo_sessions::Model)> {
    let session = sessions::Entity::find_by_id(session_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lottery session {session_id} not found")))?;

    let photo_session = photo_sessions::Entity::find_by_id(session.photo_session_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!(
                "Photo session {} missing for lottery session {session_id}",
                session.photo_session_id
            ))
        })?;

    Ok((session, photo_session))
}

fn ensure_organizer(
    photo_session: &photo_sessions::Model,
    caller_user_id: i64,
) -> AppResult<()> {
    if photo_session.organizer_id != caller_user_id {
        return Err(AppError::Forbidden(
            "Only the owning organizer may perform this operation".to_string(),
        ));
    }
    Ok(())
}

/// 按权重抽取后把候选分成中签 / 落选两组
fn split_winners<R: Rng>(
    candidates: &[(i64, f64)],
    seats: usize,
    rng: &mut R,
) -> (Vec<i64>, Vec<i64>) {
    let weights: Vec<f64> = candidates.iter().map(|(_, w)| *w).collect();
    let winner_idx = draw_winners(&weights, seats, rng);

    let chosen: std::collections::HashSet<usize> = winner_idx.into_iter().collect();
    let mut winners = Vec::new();
    let mut losers = Vec::new();
    for (i, (id, _)) in candidates.iter().enumerate() {
        if chosen.contains(&i) {
            winners.push(*id);
        } else {
            losers.push(*id);
        }
    }
    (winners, losers)
}

/// 组内中签是否生成预约
fn booking_eligible(
    policy: &CancellationPolicy,
    total_slots_applied: i32,
    won_count: usize,
) -> bool {
    match policy {
        // 全组中签才算数
        CancellationPolicy::AllOrNothing => won_count as i32 == total_slots_applied,
        CancellationPolicy::PartialOk => won_count > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_split_winners_fills_exact_seats() {
        let mut rng = StdRng::seed_from_u64(3);
        // 3 人争 1 席，权重 [1,1,5]
        let candidates = vec![(10, 1.0), (11, 1.0), (12, 5.0)];
        for _ in 0..100 {
            let (winners, losers) = split_winners(&candidates, 1, &mut rng);
            assert_eq!(winners.len(), 1);
            assert_eq!(losers.len(), 2);
        }
    }

    #[test]
    fn test_split_winners_everyone_fits() {
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = vec![(10, 1.0), (11, 2.0)];
        let (mut winners, losers) = split_winners(&candidates, 5, &mut rng);
        winners.sort();
        assert_eq!(winners, vec![10, 11]);
        assert!(losers.is_empty());
    }

    #[test]
    fn test_all_or_nothing_requires_full_group() {
        // 2 时段的组，1 中 1 落 -> 不生成预约
        assert!(!booking_eligible(&CancellationPolicy::AllOrNothing, 2, 1));
        // 全中 -> 生成
        assert!(booking_eligible(&CancellationPolicy::AllOrNothing, 2, 2));
    }

    #[test]
    fn test_partial_ok_books_individual_wins() {
        // 同样 1 中 1 落，partial_ok 生成那 1 条
        assert!(booking_eligible(&CancellationPolicy::PartialOk, 2, 1));
        assert!(!booking_eligible(&CancellationPolicy::PartialOk, 2, 0));
    }
}
