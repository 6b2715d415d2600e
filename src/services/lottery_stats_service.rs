use crate::entities::{
    CancellationPolicy, SlotEntryStatus, booking_entity as bookings,
    entry_group_entity as groups, lottery_session_entity as sessions,
    organizer_model_entity as roster, photo_session_entity as photo_sessions,
    slot_entity as slots, slot_entry_entity as entries, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    ChekiTotals, EntryCountResponse, LotteryStatisticsResponse, ModelPreferenceCount,
    PolicyDistribution, SlotEntryCount, SlotWinners, WinnerResponse, WinnersResponse,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{HashMap, HashSet};

#[derive(Clone)]
pub struct LotteryStatsService {
    pool: DatabaseConnection,
}

impl LotteryStatsService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 公开的报名数统计（无需登录）
    /// 零报名返回全 0 / 空数组，不报错
    pub async fn get_entry_count(&self, session_id: i64) -> AppResult<EntryCountResponse> {
        let (session, photo_session) = self.load_session(session_id).await?;

        let slot_rows = slots::Entity::find()
            .filter(slots::Column::PhotoSessionId.eq(photo_session.id))
            .order_by_asc(slots::Column::SlotNumber)
            .all(&self.pool)
            .await?;

        let entry_rows = entries::Entity::find()
            .filter(entries::Column::LotterySessionId.eq(session.id))
            .all(&self.pool)
            .await?;

        Ok(aggregate_entry_counts(&slot_rows, &entry_rows))
    }

    /// 主办方专用的抽选统计:
    /// 时段分布 / 模特人气 / 拍立得张数合计 / 取消策略分布
    pub async fn get_lottery_statistics(
        &self,
        session_id: i64,
        caller_user_id: i64,
    ) -> AppResult<LotteryStatisticsResponse> {
        let (session, photo_session) = self.load_session(session_id).await?;
        ensure_organizer(&photo_session, caller_user_id)?;

        let slot_rows = slots::Entity::find()
            .filter(slots::Column::PhotoSessionId.eq(photo_session.id))
            .order_by_asc(slots::Column::SlotNumber)
            .all(&self.pool)
            .await?;

        let entry_rows = entries::Entity::find()
            .filter(entries::Column::LotterySessionId.eq(session.id))
            .all(&self.pool)
            .await?;

        let group_rows = groups::Entity::find()
            .filter(groups::Column::LotterySessionId.eq(session.id))
            .all(&self.pool)
            .await?;

        let roster_rows = roster::Entity::find()
            .filter(roster::Column::OrganizerId.eq(photo_session.organizer_id))
            .all(&self.pool)
            .await?;
        let model_names: HashMap<i64, String> = roster_rows
            .into_iter()
            .map(|m| (m.id, m.model_name))
            .collect();

        let counts = aggregate_entry_counts(&slot_rows, &entry_rows);

        Ok(LotteryStatisticsResponse {
            total_entries: counts.total_entries,
            total_groups: counts.total_groups,
            entries_by_slot: counts.entries_by_slot,
            model_preferences: aggregate_model_preferences(&entry_rows, &model_names),
            cheki_totals: aggregate_cheki_totals(&entry_rows),
            policy_distribution: aggregate_policy_distribution(&group_rows),
        })
    }

    /// 主办方专用的中签名单（含用户昵称与预约关联）
    /// 每时段内按 won_at 升序，无 won_at 的排最后
    pub async fn get_winners(
        &self,
        session_id: i64,
        caller_user_id: i64,
    ) -> AppResult<WinnersResponse> {
        let (session, photo_session) = self.load_session(session_id).await?;
        ensure_organizer(&photo_session, caller_user_id)?;

        let slot_rows = slots::Entity::find()
            .filter(slots::Column::PhotoSessionId.eq(photo_session.id))
            .order_by_asc(slots::Column::SlotNumber)
            .all(&self.pool)
            .await?;

        let won = entries::Entity::find()
            .filter(entries::Column::LotterySessionId.eq(session.id))
            .filter(entries::Column::Status.eq(SlotEntryStatus::Won))
            .all(&self.pool)
            .await?;

        let user_ids: HashSet<i64> = won.iter().map(|e| e.user_id).collect();
        let nickname_map: HashMap<i64, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids.into_iter().collect::<Vec<_>>()))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u.nickname))
            .collect();

        let booking_map: HashMap<i64, i64> = bookings::Entity::find()
            .filter(bookings::Column::LotterySessionId.eq(session.id))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|b| (b.slot_entry_id, b.id))
            .collect();

        let model_names: HashMap<i64, String> = roster::Entity::find()
            .filter(roster::Column::OrganizerId.eq(photo_session.organizer_id))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|m| (m.id, m.model_name))
            .collect();

        let mut result = Vec::new();
        for slot in &slot_rows {
            let mut winners: Vec<WinnerResponse> = won
                .iter()
                .filter(|e| e.slot_id == slot.id)
                .map(|e| WinnerResponse {
                    slot_entry_id: e.id,
                    user_id: e.user_id,
                    nickname: nickname_map
                        .get(&e.user_id)
                        .cloned()
                        .unwrap_or_default(),
                    booking_id: booking_map.get(&e.id).copied(),
                    preferred_model_id: e.preferred_model_id,
                    preferred_model_name: e
                        .preferred_model_id
                        .and_then(|id| model_names.get(&id).cloned()),
                    won_at: e.won_at,
                })
                .collect();

            sort_winners(&mut winners);

            if !winners.is_empty() {
                result.push(SlotWinners {
                    slot_id: slot.id,
                    slot_number: slot.slot_number,
                    winners,
                });
            }
        }

        Ok(WinnersResponse { slots: result })
    }

    async fn load_session(
        &self,
        session_id: i64,
    ) -> AppResult<(sessions::Model, photo_sessions::Model)> {
        let session = sessions::Entity::find_by_id(session_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lottery session {session_id} not found")))?;

        let photo_session = photo_sessions::Entity::find_by_id(session.photo_session_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(format!(
                    "Photo session {} missing for lottery session {session_id}",
                    session.photo_session_id
                ))
            })?;

        Ok((session, photo_session))
    }
}

fn ensure_organizer(
    photo_session: &photo_sessions::Model,
    caller_user_id: i64,
) -> AppResult<()> {
    if photo_session.organizer_id != caller_user_id {
        return Err(AppError::Forbidden(
            "Only the owning organizer may view lottery details".to_string(),
        ));
    }
    Ok(())
}

/// 时段报名数聚合（只列出有报名的时段，按时段序号排序）
fn aggregate_entry_counts(
    slot_rows: &[slots::Model],
    entry_rows: &[entries::Model],
) -> EntryCountResponse {
    let mut per_slot: HashMap<i64, i64> = HashMap::new();
    let mut group_ids: HashSet<i64> = HashSet::new();
    for e in entry_rows {
        *per_slot.entry(e.slot_id).or_default() += 1;
        group_ids.insert(e.entry_group_id);
    }

    let entries_by_slot: Vec<SlotEntryCount> = slot_rows
        .iter()
        .filter_map(|s| {
            per_slot.get(&s.id).map(|&count| SlotEntryCount {
                slot_id: s.id,
                slot_number: s.slot_number,
                entry_count: count,
            })
        })
        .collect();

    EntryCountResponse {
        total_entries: entry_rows.len() as i64,
        total_groups: group_ids.len() as i64,
        entries_by_slot,
    }
}

/// 模特人气直方图（人气降序，同数按 model_id 升序）
fn aggregate_model_preferences(
    entry_rows: &[entries::Model],
    model_names: &HashMap<i64, String>,
) -> Vec<ModelPreferenceCount> {
    let mut counts: HashMap<i64, i64> = HashMap::new();
    for e in entry_rows {
        if let Some(model_id) = e.preferred_model_id {
            *counts.entry(model_id).or_default() += 1;
        }
    }

    let mut histogram: Vec<ModelPreferenceCount> = counts
        .into_iter()
        .map(|(model_id, count)| ModelPreferenceCount {
            model_id,
            model_name: model_names.get(&model_id).cloned().unwrap_or_default(),
            count,
        })
        .collect();
    histogram.sort_by(|a, b| b.count.cmp(&a.count).then(a.model_id.cmp(&b.model_id)));
    histogram
}

fn aggregate_cheki_totals(entry_rows: &[entries::Model]) -> ChekiTotals {
    let mut totals = ChekiTotals::default();
    for e in entry_rows {
        totals.unsigned += e.cheki_unsigned_count as i64;
        totals.signed += e.cheki_signed_count as i64;
    }
    totals
}

fn aggregate_policy_distribution(group_rows: &[groups::Model]) -> PolicyDistribution {
    let mut dist = PolicyDistribution::default();
    for g in group_rows {
        match g.cancellation_policy {
            CancellationPolicy::AllOrNothing => dist.all_or_nothing += 1,
            CancellationPolicy::PartialOk => dist.partial_ok += 1,
        }
    }
    dist
}

/// won_at 升序，无 won_at 的排最后；同时间按条目ID稳定排序
fn sort_winners(winners: &mut [WinnerResponse]) {
    winners.sort_by(|a, b| match (&a.won_at, &b.won_at) {
        (Some(x), Some(y)) => x.cmp(y).then(a.slot_entry_id.cmp(&b.slot_entry_id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.slot_entry_id.cmp(&b.slot_entry_id),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntryGroupStatus, SlotEntryStatus};
    use chrono::{TimeZone, Utc};

    fn slot(id: i64, number: i32) -> slots::Model {
        slots::Model {
            id,
            photo_session_id: 1,
            slot_number: number,
            max_participants: 2,
            created_at: None,
        }
    }

    fn entry(id: i64, slot_id: i64, group_id: i64) -> entries::Model {
        entries::Model {
            id,
            lottery_session_id: 1,
            entry_group_id: group_id,
            slot_id,
            user_id: group_id,
            preferred_model_id: None,
            cheki_unsigned_count: 1,
            cheki_signed_count: 2,
            lottery_weight: 1.0,
            status: SlotEntryStatus::Entered,
            won_at: None,
            created_at: None,
        }
    }

    fn group(id: i64, policy: CancellationPolicy) -> groups::Model {
        groups::Model {
            id,
            lottery_session_id: 1,
            user_id: id,
            cancellation_policy: policy,
            total_slots_applied: 1,
            update_count: 0,
            status: EntryGroupStatus::Active,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_zero_entries_yield_empty_aggregates() {
        let result = aggregate_entry_counts(&[slot(1, 1), slot(2, 2)], &[]);
        assert_eq!(result.total_entries, 0);
        assert_eq!(result.total_groups, 0);
        assert!(result.entries_by_slot.is_empty());
    }

    #[test]
    fn test_entry_counts_group_by_slot() {
        let entry_rows = vec![entry(1, 10, 100), entry(2, 10, 101), entry(3, 20, 101)];
        let result = aggregate_entry_counts(&[slot(10, 1), slot(20, 2), slot(30, 3)], &entry_rows);
        assert_eq!(result.total_entries, 3);
        assert_eq!(result.total_groups, 2);
        assert_eq!(
            result.entries_by_slot,
            vec![
                SlotEntryCount {
                    slot_id: 10,
                    slot_number: 1,
                    entry_count: 2
                },
                SlotEntryCount {
                    slot_id: 20,
                    slot_number: 2,
                    entry_count: 1
                },
            ]
        );
    }

    #[test]
    fn test_model_preference_histogram_orders_by_popularity() {
        let mut e1 = entry(1, 10, 100);
        e1.preferred_model_id = Some(7);
        let mut e2 = entry(2, 10, 101);
        e2.preferred_model_id = Some(8);
        let mut e3 = entry(3, 20, 102);
        e3.preferred_model_id = Some(8);
        let e4 = entry(4, 20, 103); // 未指定

        let names: HashMap<i64, String> =
            [(7, "Rin".to_string()), (8, "Yui".to_string())].into();
        let histogram = aggregate_model_preferences(&[e1, e2, e3, e4], &names);

        assert_eq!(histogram.len(), 2);
        assert_eq!(histogram[0].model_id, 8);
        assert_eq!(histogram[0].model_name, "Yui");
        assert_eq!(histogram[0].count, 2);
        assert_eq!(histogram[1].model_id, 7);
        assert_eq!(histogram[1].count, 1);
    }

    #[test]
    fn test_cheki_totals_sum_both_kinds() {
        let totals = aggregate_cheki_totals(&[entry(1, 10, 100), entry(2, 20, 100)]);
        assert_eq!(totals.unsigned, 2);
        assert_eq!(totals.signed, 4);
    }

    #[test]
    fn test_policy_distribution() {
        let dist = aggregate_policy_distribution(&[
            group(1, CancellationPolicy::AllOrNothing),
            group(2, CancellationPolicy::PartialOk),
            group(3, CancellationPolicy::PartialOk),
        ]);
        assert_eq!(dist.all_or_nothing, 1);
        assert_eq!(dist.partial_ok, 2);
    }

    fn winner(slot_entry_id: i64, won_at: Option<i64>) -> WinnerResponse {
        WinnerResponse {
            slot_entry_id,
            user_id: 1,
            nickname: "a".to_string(),
            booking_id: None,
            preferred_model_id: None,
            preferred_model_name: None,
            won_at: won_at.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
        }
    }

    #[test]
    fn test_winner_sort_puts_missing_won_at_last() {
        let mut list = vec![winner(1, None), winner(2, Some(200)), winner(3, Some(100))];
        sort_winners(&mut list);
        let ids: Vec<i64> = list.iter().map(|w| w.slot_entry_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
