use rand::Rng;

/// 按权重不放回抽取 k 个中签者 (Efraimidis–Spirtes A-ES)
///
/// 每个候选生成 key = ln(u) / w (u ~ U(0,1))，取 key 最大的 k 个。
/// 等价于 u^(1/w) 排序，但对极小权重数值上更稳定。
/// 中签概率与 lottery_weight 成正比；权重为 0 的候选只在
/// 正权重候选不足以填满席位时才可能中签。
///
/// 返回中签候选的下标，按抽出顺序（key 降序）排列。
pub fn draw_winners<R: Rng>(weights: &[f64], seats: usize, rng: &mut R) -> Vec<usize> {
    if seats == 0 || weights.is_empty() {
        return Vec::new();
    }

    let mut keyed: Vec<(usize, f64)> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            // u ∈ (0,1]，避免 ln(0)
            let u: f64 = 1.0 - rng.gen_range(0.0..1.0f64);
            let key = if w > 0.0 {
                u.ln() / w
            } else {
                // 零权重候选排在所有正权重之后
                f64::NEG_INFINITY
            };
            (i, key)
        })
        .collect();

    // key 降序；NEG_INFINITY (零权重) 落到末尾
    keyed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    keyed
        .into_iter()
        .take(seats.min(weights.len()))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_draws_all_when_seats_exceed_candidates() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut winners = draw_winners(&[1.0, 2.0, 3.0], 10, &mut rng);
        winners.sort();
        assert_eq!(winners, vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_seats_draws_nobody() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(draw_winners(&[1.0, 1.0], 0, &mut rng).is_empty());
        assert!(draw_winners(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_winners_are_distinct() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let mut winners = draw_winners(&[1.0, 1.0, 5.0, 0.5], 2, &mut rng);
            winners.sort();
            winners.dedup();
            assert_eq!(winners.len(), 2);
        }
    }

    #[test]
    fn test_zero_weight_loses_to_positive_weight() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let winners = draw_winners(&[0.0, 1.0], 1, &mut rng);
            assert_eq!(winners, vec![1]);
        }
        // 席位富余时零权重也能进
        let mut winners = draw_winners(&[0.0, 1.0], 2, &mut rng);
        winners.sort();
        assert_eq!(winners, vec![0, 1]);
    }

    /// 权重 [3,1] 抽 1 席，多次试验中权重 3 的候选
    /// 中签频率应约为 3/4
    #[test]
    fn test_weight_proportional_selection() {
        let mut rng = StdRng::seed_from_u64(20260110);
        let trials = 20_000;
        let mut heavy_wins = 0;
        for _ in 0..trials {
            if draw_winners(&[3.0, 1.0], 1, &mut rng) == vec![0] {
                heavy_wins += 1;
            }
        }
        let ratio = heavy_wins as f64 / trials as f64;
        assert!(
            (ratio - 0.75).abs() < 0.02,
            "expected ~0.75, got {ratio}"
        );
    }

    /// 无放回抽 2 席时，首位按权重、次席按剩余权重归一化。
    /// 权重 [1,1,5] 抽 1 席：重权候选应明显占优
    #[test]
    fn test_heavy_candidate_dominates_single_seat() {
        let mut rng = StdRng::seed_from_u64(99);
        let trials = 10_000;
        let mut heavy_wins = 0;
        for _ in 0..trials {
            if draw_winners(&[1.0, 1.0, 5.0], 1, &mut rng) == vec![2] {
                heavy_wins += 1;
            }
        }
        let ratio = heavy_wins as f64 / trials as f64;
        // 理论值 5/7 ≈ 0.714
        assert!(
            (ratio - 5.0 / 7.0).abs() < 0.02,
            "expected ~0.714, got {ratio}"
        );
    }
}
