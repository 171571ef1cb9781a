//! Read-only view onto the external lockup contract that owns the
//! `PeriodLock` records. The query interface lives here the same way the
//! gauge orchestrator defines the adapter interface it consumes.

use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Coin, QuerierWrapper, StdResult, Timestamp, Uint128};

use crate::error::ContractError;

/// A time-locked stake held by the lockup contract.
#[cw_serde]
pub struct PeriodLock {
    pub id: u64,
    /// Bech32 address of the lock owner
    pub owner: String,
    /// Lock duration in nanoseconds
    pub duration: u64,
    /// Time at which the lock finishes unlocking; zero if unlocking
    /// has not started
    pub end_time: Timestamp,
    pub coins: Vec<Coin>,
}

impl PeriodLock {
    /// Returns true if the lock already started unlocking
    pub fn is_unlocking(&self) -> bool {
        self.end_time.nanos() != 0
    }

    /// Amount of `denom` held by this lock. Does not validate the denom,
    /// locks may carry synthetic denoms.
    pub fn amount_of(&self, denom: &str) -> Uint128 {
        self.coins
            .iter()
            .find(|coin| coin.denom == denom)
            .map(|coin| coin.amount)
            .unwrap_or_default()
    }
}

/// Selector for the locks a gauge pays out to
#[cw_serde]
pub enum QueryCondition {
    /// Locks of `denom` locked for at least `duration` nanoseconds
    ByDuration { denom: String, duration: u64 },
    /// Locks of `denom` whose unlock time is before `timestamp`
    ByTime { denom: String, timestamp: Timestamp },
}

impl QueryCondition {
    pub fn denom(&self) -> &str {
        match self {
            QueryCondition::ByDuration { denom, .. } => denom,
            QueryCondition::ByTime { denom, .. } => denom,
        }
    }
}

/// Queries this contract requires from the lockup contract in order to
/// function
#[cw_serde]
#[derive(QueryResponses)]
pub enum LockupQueryMsg {
    /// Locks of `denom` with a duration of at least `duration` nanoseconds,
    /// ordered by lock id
    #[returns(LocksResponse)]
    LocksLongerThanDuration { denom: String, duration: u64 },
    /// Unlocking locks of `denom` whose end time is before `timestamp`,
    /// ordered by lock id
    #[returns(LocksResponse)]
    LocksPastTime { denom: String, timestamp: Timestamp },
    /// Total locked amount matching the condition
    #[returns(AccumulationResponse)]
    PeriodLocksAccumulation { condition: QueryCondition },
}

#[cw_serde]
pub struct LocksResponse {
    pub locks: Vec<PeriodLock>,
}

#[cw_serde]
pub struct AccumulationResponse {
    pub amount: Uint128,
}

/// Thin wrapper around the lockup contract queries
pub struct LockupQuerier<'a> {
    querier: &'a QuerierWrapper<'a>,
    contract: &'a Addr,
}

impl<'a> LockupQuerier<'a> {
    pub fn new(querier: &'a QuerierWrapper, contract: &'a Addr) -> Self {
        LockupQuerier { querier, contract }
    }

    pub fn locks_longer_than(&self, denom: &str, duration: u64) -> StdResult<Vec<PeriodLock>> {
        let response: LocksResponse = self.querier.query_wasm_smart(
            self.contract,
            &LockupQueryMsg::LocksLongerThanDuration {
                denom: denom.to_string(),
                duration,
            },
        )?;
        Ok(response.locks)
    }

    pub fn locks_past_time(&self, denom: &str, timestamp: Timestamp) -> StdResult<Vec<PeriodLock>> {
        let response: LocksResponse = self.querier.query_wasm_smart(
            self.contract,
            &LockupQueryMsg::LocksPastTime {
                denom: denom.to_string(),
                timestamp,
            },
        )?;
        Ok(response.locks)
    }

    pub fn period_locks_accumulation(&self, condition: &QueryCondition) -> StdResult<Uint128> {
        let response: AccumulationResponse = self.querier.query_wasm_smart(
            self.contract,
            &LockupQueryMsg::PeriodLocksAccumulation {
                condition: condition.clone(),
            },
        )?;
        Ok(response.amount)
    }

    /// Locks matching the gauge's condition, for the estimation path
    pub fn locks_to_distribution(&self, condition: &QueryCondition) -> StdResult<Vec<PeriodLock>> {
        match condition {
            QueryCondition::ByDuration { denom, duration } => {
                self.locks_longer_than(denom, *duration)
            }
            QueryCondition::ByTime { denom, timestamp } => {
                self.locks_past_time(denom, *timestamp)
            }
        }
    }

    /// Locks for the hot distribution path, queried with at most
    /// `min_duration` so one query can serve every gauge on the denom.
    /// Time-based conditions never reach distribution.
    pub fn locks_to_distribution_with_min_duration(
        &self,
        condition: &QueryCondition,
        min_duration: u64,
    ) -> Result<Vec<PeriodLock>, ContractError> {
        match condition {
            QueryCondition::ByDuration { denom, duration } => {
                Ok(self.locks_longer_than(denom, (*duration).min(min_duration))?)
            }
            QueryCondition::ByTime { .. } => Err(ContractError::ByTimeCondition {}),
        }
    }
}

/// Strips the synthetic suffix the superfluid module appends to lock denoms.
/// Reward math always works on the base denom.
pub fn native_denom(denom: &str) -> &str {
    if let Some((native, _)) = denom.split_once("superbonding") {
        native
    } else if let Some((native, _)) = denom.split_once("superunbonding") {
        native
    } else {
        denom
    }
}

/// Sums the `denom` holdings over a set of locks. The denom is not
/// validated, locks may carry synthetic denoms.
pub fn sum_locks_by_denom<'a>(
    locks: impl IntoIterator<Item = &'a PeriodLock>,
    denom: &str,
) -> Uint128 {
    locks
        .into_iter()
        .fold(Uint128::zero(), |sum, lock| sum + lock.amount_of(denom))
}

/// In-memory filter of a cached lock list down to one gauge's duration
/// condition
pub fn filter_locks_by_min_duration(locks: &[PeriodLock], min_duration: u64) -> Vec<&PeriodLock> {
    locks
        .iter()
        .filter(|lock| lock.duration >= min_duration)
        .collect()
}

#[cfg(test)]
mod tests {
    use cosmwasm_std::coins;

    use super::*;

    fn lock(id: u64, duration: u64, amount: u128, denom: &str) -> PeriodLock {
        PeriodLock {
            id,
            owner: "owner".to_string(),
            duration,
            end_time: Timestamp::from_nanos(0),
            coins: coins(amount, denom),
        }
    }

    #[test]
    fn native_denom_strips_synthetic_suffixes() {
        assert_eq!(native_denom("ufoo"), "ufoo");
        assert_eq!(native_denom("gamm/pool/1superbonding/valoper1"), "gamm/pool/1");
        assert_eq!(
            native_denom("gamm/pool/1superunbonding/valoper1"),
            "gamm/pool/1"
        );
    }

    #[test]
    fn sum_ignores_other_denoms() {
        let locks = vec![
            lock(1, 10, 100, "ufoo"),
            lock(2, 10, 50, "ubar"),
            lock(3, 10, 7, "ufoo"),
        ];
        assert_eq!(sum_locks_by_denom(&locks, "ufoo"), Uint128::new(107));
        assert_eq!(sum_locks_by_denom(&locks, "ubar"), Uint128::new(50));
        assert_eq!(sum_locks_by_denom(&locks, "ubaz"), Uint128::zero());
    }

    #[test]
    fn filter_keeps_locks_at_least_as_long() {
        let locks = vec![
            lock(1, 5, 1, "ufoo"),
            lock(2, 10, 1, "ufoo"),
            lock(3, 20, 1, "ufoo"),
        ];
        let filtered = filter_locks_by_min_duration(&locks, 10);
        let ids: Vec<_> = filtered.iter().map(|lock| lock.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn unlocking_starts_with_nonzero_end_time() {
        let mut l = lock(1, 10, 1, "ufoo");
        assert!(!l.is_unlocking());
        l.end_time = Timestamp::from_seconds(1000);
        assert!(l.is_unlocking());
    }
}
