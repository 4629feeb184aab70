//! Read-only rollups over the referral and earning ledgers. Everything here
//! is derived on each request; nothing is stored back.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use serde::Serialize;

use crate::models::earning::{Earning, EarningStatus};
use crate::models::referral::{Referral, ReferralStatus};

const MS_PER_DAY: f64 = 86_400_000.0;
const MONTHLY_BUCKET_CAP: usize = 12;
const TOP_REFERRAL_CAP: usize = 5;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_referrals: usize,
    pub completed_referrals: usize,
    pub conversion_rate: f64,
    /// Mean creation-to-completion latency in whole days.
    pub avg_conversion_time: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    pub month: String,
    pub count: usize,
    pub total_earnings: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusStat {
    pub status: ReferralStatus,
    pub count: usize,
    pub commission: i64,
    pub bonus: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCounts {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EarningTotals {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub paid: i64,
}

pub fn overview(referrals: &[Referral]) -> Overview {
    let completed: Vec<&Referral> = referrals
        .iter()
        .filter(|r| r.status == ReferralStatus::Completed)
        .collect();

    let conversion_rate = if referrals.is_empty() {
        0.0
    } else {
        completed.len() as f64 / referrals.len() as f64 * 100.0
    };

    let avg_conversion_time = if completed.is_empty() {
        0
    } else {
        let total_ms: i64 = completed
            .iter()
            .map(|r| r.updated_at.timestamp_millis() - r.created_at.timestamp_millis())
            .sum();
        (total_ms as f64 / completed.len() as f64 / MS_PER_DAY).round() as i64
    };

    Overview {
        total_referrals: referrals.len(),
        completed_referrals: completed.len(),
        conversion_rate,
        avg_conversion_time,
    }
}

/// Calendar-month buckets, newest first, capped at 12.
pub fn monthly_buckets(referrals: &[Referral]) -> Vec<MonthlyBucket> {
    let mut buckets: BTreeMap<String, (usize, i64)> = BTreeMap::new();

    for referral in referrals {
        let month = match Utc.timestamp_millis_opt(referral.created_at.timestamp_millis()) {
            chrono::LocalResult::Single(dt) => dt.format("%Y-%m").to_string(),
            _ => continue,
        };
        let entry = buckets.entry(month).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += referral.commission + referral.bonus;
    }

    buckets
        .into_iter()
        .rev()
        .take(MONTHLY_BUCKET_CAP)
        .map(|(month, (count, total_earnings))| MonthlyBucket {
            month,
            count,
            total_earnings,
        })
        .collect()
}

/// Per-status count and reward sums, only for statuses that occur.
pub fn status_stats(referrals: &[Referral]) -> Vec<StatusStat> {
    [
        ReferralStatus::Pending,
        ReferralStatus::Confirmed,
        ReferralStatus::Completed,
        ReferralStatus::Cancelled,
    ]
    .into_iter()
    .filter_map(|status| {
        let rows: Vec<&Referral> = referrals.iter().filter(|r| r.status == status).collect();
        if rows.is_empty() {
            return None;
        }
        Some(StatusStat {
            status,
            count: rows.len(),
            commission: rows.iter().map(|r| r.commission).sum(),
            bonus: rows.iter().map(|r| r.bonus).sum(),
        })
    })
    .collect()
}

/// Top earners: commission descending, bonus breaking ties, capped at 5.
pub fn top_referrals(referrals: &[Referral]) -> Vec<&Referral> {
    let mut sorted: Vec<&Referral> = referrals.iter().collect();
    sorted.sort_by(|a, b| {
        b.commission
            .cmp(&a.commission)
            .then(b.bonus.cmp(&a.bonus))
    });
    sorted.truncate(TOP_REFERRAL_CAP);
    sorted
}

pub fn referral_counts(referrals: &[Referral]) -> ReferralCounts {
    let count = |status| referrals.iter().filter(|r| r.status == status).count();
    ReferralCounts {
        total: referrals.len(),
        pending: count(ReferralStatus::Pending),
        confirmed: count(ReferralStatus::Confirmed),
        completed: count(ReferralStatus::Completed),
    }
}

pub fn earning_totals(earnings: &[Earning]) -> EarningTotals {
    let sum = |status| {
        earnings
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.amount)
            .sum()
    };
    EarningTotals {
        total: earnings.iter().map(|e| e.amount).sum(),
        pending: sum(EarningStatus::Pending),
        approved: sum(EarningStatus::Approved),
        paid: sum(EarningStatus::Paid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::earning::EarningType;
    use mongodb::bson::{oid::ObjectId, DateTime};

    fn referral_at(status: ReferralStatus, created_ms: i64, updated_ms: i64) -> Referral {
        Referral {
            id: Some(ObjectId::new()),
            referrer_id: ObjectId::new(),
            referred_id: ObjectId::new(),
            status,
            commission: 10_000,
            bonus: 5_000,
            created_at: DateTime::from_millis(created_ms),
            updated_at: DateTime::from_millis(updated_ms),
        }
    }

    fn earning(status: EarningStatus, amount: i64) -> Earning {
        Earning {
            id: Some(ObjectId::new()),
            user_id: ObjectId::new(),
            earning_type: EarningType::ReferralBonus,
            amount,
            description: String::new(),
            status,
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        }
    }

    #[test]
    fn conversion_rate_is_zero_without_referrals() {
        let o = overview(&[]);
        assert_eq!(o.conversion_rate, 0.0);
        assert_eq!(o.avg_conversion_time, 0);
        assert_eq!(o.total_referrals, 0);
    }

    #[test]
    fn conversion_rate_is_completed_over_total() {
        let rows = vec![
            referral_at(ReferralStatus::Completed, 0, 0),
            referral_at(ReferralStatus::Pending, 0, 0),
            referral_at(ReferralStatus::Pending, 0, 0),
            referral_at(ReferralStatus::Cancelled, 0, 0),
        ];
        let o = overview(&rows);
        assert_eq!(o.total_referrals, 4);
        assert_eq!(o.completed_referrals, 1);
        assert_eq!(o.conversion_rate, 25.0);
    }

    #[test]
    fn avg_conversion_time_only_counts_completed_rows() {
        let two_days = 2 * 86_400_000;
        let four_days = 4 * 86_400_000;
        let rows = vec![
            referral_at(ReferralStatus::Completed, 0, two_days),
            referral_at(ReferralStatus::Completed, 0, four_days),
            // Pending row with a huge window must not skew the mean.
            referral_at(ReferralStatus::Pending, 0, 100 * 86_400_000),
        ];
        assert_eq!(overview(&rows).avg_conversion_time, 3);
    }

    #[test]
    fn monthly_buckets_are_newest_first_and_capped() {
        let month_ms = 32 * 86_400_000i64;
        let rows: Vec<Referral> = (0..15)
            .flat_map(|m| {
                vec![
                    referral_at(ReferralStatus::Pending, m * month_ms, m * month_ms),
                    referral_at(ReferralStatus::Pending, m * month_ms, m * month_ms),
                ]
            })
            .collect();

        let buckets = monthly_buckets(&rows);
        assert_eq!(buckets.len(), 12);
        assert!(buckets.windows(2).all(|w| w[0].month > w[1].month));
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].total_earnings, 30_000);
    }

    #[test]
    fn status_stats_skip_absent_statuses() {
        let rows = vec![
            referral_at(ReferralStatus::Pending, 0, 0),
            referral_at(ReferralStatus::Pending, 0, 0),
            referral_at(ReferralStatus::Completed, 0, 0),
        ];
        let stats = status_stats(&rows);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].status, ReferralStatus::Pending);
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].commission, 20_000);
        assert_eq!(stats[1].status, ReferralStatus::Completed);
    }

    #[test]
    fn top_referrals_rank_by_commission_then_bonus() {
        let mut a = referral_at(ReferralStatus::Pending, 0, 0);
        a.commission = 20_000;
        a.bonus = 1_000;
        let mut b = referral_at(ReferralStatus::Pending, 0, 0);
        b.commission = 20_000;
        b.bonus = 9_000;
        let mut c = referral_at(ReferralStatus::Pending, 0, 0);
        c.commission = 30_000;
        c.bonus = 0;

        let rows = vec![a, b, c];
        let top = top_referrals(&rows);
        assert_eq!(top[0].commission, 30_000);
        assert_eq!(top[1].bonus, 9_000);
        assert_eq!(top[2].bonus, 1_000);
    }

    #[test]
    fn top_referrals_cap_at_five() {
        let rows: Vec<Referral> = (0..8)
            .map(|_| referral_at(ReferralStatus::Pending, 0, 0))
            .collect();
        assert_eq!(top_referrals(&rows).len(), 5);
    }

    #[test]
    fn earning_totals_group_by_status() {
        let rows = vec![
            earning(EarningStatus::Pending, 15_000),
            earning(EarningStatus::Approved, 15_000),
            earning(EarningStatus::Approved, 5_000),
            earning(EarningStatus::Paid, 1_000),
            earning(EarningStatus::Cancelled, 99_000),
        ];
        let totals = earning_totals(&rows);
        assert_eq!(totals.total, 135_000);
        assert_eq!(totals.pending, 15_000);
        assert_eq!(totals.approved, 20_000);
        assert_eq!(totals.paid, 1_000);
    }
}
