use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Coins, Empty, Order, StdError, StdResult, Storage, Timestamp};
use cw_storage_plus::{Bound, Item, Map};

use crate::error::ContractError;
use crate::lockup::QueryCondition;

/// Type alias for u64 to make the map types a bit more self-explanatory
pub type GaugeId = u64;

pub const CONFIG: Item<Config> = Item::new("config");

/// Primary record of every gauge, keyed by id
pub const GAUGES: Map<GaugeId, Gauge> = Map::new("gauges");
const LAST_ID: Item<GaugeId> = Item::new("last_id");

/// Lifecycle indexes, keyed by `(start_time_ns, gauge_id)`. Both components
/// serialize big-endian, so an ascending range walks gauges in chronological
/// order with ties broken by id. Every gauge lives in exactly one of the
/// three at any time.
pub const UPCOMING_GAUGES: Map<(u64, GaugeId), Empty> = Map::new("upcoming_gauges");
pub const ACTIVE_GAUGES: Map<(u64, GaugeId), Empty> = Map::new("active_gauges");
pub const FINISHED_GAUGES: Map<(u64, GaugeId), Empty> = Map::new("finished_gauges");

/// Gauges paying out to a given denom; entries are written at creation and
/// removed when the gauge finishes
pub const GAUGES_BY_DENOM: Map<(&str, GaugeId), Empty> = Map::new("gauges_by_denom");

/// Get ID for gauge registration and increment value in storage
pub fn next_gauge_id(storage: &mut dyn Storage) -> StdResult<GaugeId> {
    let id = LAST_ID.may_load(storage)?.unwrap_or_default() + 1;
    LAST_ID.save(storage, &id)?;
    Ok(id)
}

#[cw_serde]
pub struct Config {
    /// Lockup contract owning the `PeriodLock` records
    pub lockup: Addr,
    /// Only this address may trigger the per-epoch distribution
    pub epoch_driver: Addr,
}

#[cw_serde]
pub struct Gauge {
    pub id: GaugeId,
    /// A perpetual gauge pays its entire remaining balance every epoch and
    /// never finishes; a non-perpetual gauge pays over `num_epochs_paid_over`
    /// epochs
    pub is_perpetual: bool,
    /// Which locks this gauge pays out to
    pub distribute_to: QueryCondition,
    /// Total budget ever allocated to the gauge
    pub coins: Vec<Coin>,
    /// Earliest time distribution may begin
    pub start_time: Timestamp,
    /// Number of epochs the budget is spread over; unused when perpetual
    pub num_epochs_paid_over: u64,
    /// Epochs already distributed
    pub filled_epochs: u64,
    /// Cumulative amount actually paid out so far
    pub distributed_coins: Vec<Coin>,
}

impl Gauge {
    pub fn is_upcoming(&self, now: Timestamp) -> bool {
        now < self.start_time
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        !self.is_upcoming(now)
            && (self.is_perpetual || self.filled_epochs < self.num_epochs_paid_over)
    }

    pub fn is_finished(&self, now: Timestamp) -> bool {
        !self.is_upcoming(now) && !self.is_active(now)
    }

    /// Epochs the remaining balance is still spread over. A perpetual gauge
    /// pays everything in the next epoch.
    pub fn remaining_epochs(&self) -> u64 {
        if self.is_perpetual {
            1
        } else {
            self.num_epochs_paid_over.saturating_sub(self.filled_epochs)
        }
    }

    /// Budget not yet paid out, `coins - distributed_coins`
    pub fn remaining_coins(&self) -> Result<Coins, ContractError> {
        let distributed = Coins::try_from(self.distributed_coins.clone())?;
        let mut remain = Coins::default();
        for coin in &self.coins {
            let amount = coin
                .amount
                .checked_sub(distributed.amount_of(&coin.denom))
                .map_err(StdError::overflow)?;
            if !amount.is_zero() {
                remain.add(Coin {
                    denom: coin.denom.clone(),
                    amount,
                })?;
            }
        }
        Ok(remain)
    }

    fn index_key(&self) -> (u64, GaugeId) {
        (self.start_time.nanos(), self.id)
    }
}

/// Registers a freshly created gauge: primary record, upcoming index and
/// denom index
pub fn create_gauge(storage: &mut dyn Storage, gauge: &Gauge) -> Result<(), ContractError> {
    GAUGES.save(storage, gauge.id, gauge)?;
    UPCOMING_GAUGES.save(storage, gauge.index_key(), &Empty {})?;
    GAUGES_BY_DENOM.save(storage, (gauge.distribute_to.denom(), gauge.id), &Empty {})?;
    Ok(())
}

/// Moves a gauge whose start time has passed from the upcoming index into
/// the active index. The primary record is left untouched.
pub fn begin_distribution(
    storage: &mut dyn Storage,
    block_time: Timestamp,
    gauge: &Gauge,
) -> Result<(), ContractError> {
    if block_time < gauge.start_time {
        return Err(ContractError::DistributionNotStarted {
            gauge_id: gauge.id,
            block_time: block_time.nanos(),
            start_time: gauge.start_time.nanos(),
        });
    }
    let key = gauge.index_key();
    if !UPCOMING_GAUGES.has(storage, key) {
        return Err(ContractError::GaugeNotUpcoming(gauge.id));
    }
    UPCOMING_GAUGES.remove(storage, key);
    ACTIVE_GAUGES.save(storage, key, &Empty {})?;
    Ok(())
}

/// Moves a fully paid out gauge from the active index into the finished
/// index and drops its denom index entry. The primary record is left
/// untouched.
pub fn finish_distribution(storage: &mut dyn Storage, gauge: &Gauge) -> Result<(), ContractError> {
    let key = gauge.index_key();
    if !ACTIVE_GAUGES.has(storage, key) {
        return Err(ContractError::GaugeNotActive(gauge.id));
    }
    ACTIVE_GAUGES.remove(storage, key);
    FINISHED_GAUGES.save(storage, key, &Empty {})?;
    GAUGES_BY_DENOM.remove(storage, (gauge.distribute_to.denom(), gauge.id));
    Ok(())
}

/// Ids of upcoming gauges with `start_time <= time`, in index order
pub fn upcoming_gauge_ids_through(storage: &dyn Storage, time: Timestamp) -> StdResult<Vec<GaugeId>> {
    UPCOMING_GAUGES
        .keys(
            storage,
            None,
            Some(Bound::inclusive((time.nanos(), u64::MAX))),
            Order::Ascending,
        )
        .map(|key| key.map(|(_, id)| id))
        .collect()
}

/// Ids of all active gauges, in index order
pub fn active_gauge_ids(storage: &dyn Storage) -> StdResult<Vec<GaugeId>> {
    ACTIVE_GAUGES
        .keys(storage, None, None, Order::Ascending)
        .map(|key| key.map(|(_, id)| id))
        .collect()
}

pub fn load_gauges(storage: &dyn Storage, ids: &[GaugeId]) -> StdResult<Vec<Gauge>> {
    ids.iter().map(|id| GAUGES.load(storage, *id)).collect()
}

#[cfg(test)]
mod tests {
    use cosmwasm_std::coins;
    use cosmwasm_std::testing::mock_dependencies;

    use super::*;

    fn gauge(id: GaugeId, start_time: u64) -> Gauge {
        Gauge {
            id,
            is_perpetual: false,
            distribute_to: QueryCondition::ByDuration {
                denom: "ufoo".to_string(),
                duration: 1000,
            },
            coins: coins(100, "ufoo"),
            start_time: Timestamp::from_nanos(start_time),
            num_epochs_paid_over: 10,
            filled_epochs: 0,
            distributed_coins: vec![],
        }
    }

    #[test]
    fn gauge_ids_are_monotonic() {
        let mut deps = mock_dependencies();
        assert_eq!(next_gauge_id(deps.as_mut().storage).unwrap(), 1);
        assert_eq!(next_gauge_id(deps.as_mut().storage).unwrap(), 2);
        assert_eq!(next_gauge_id(deps.as_mut().storage).unwrap(), 3);
    }

    #[test]
    fn upcoming_iteration_is_chronological_with_id_tiebreak() {
        let mut deps = mock_dependencies();
        // insertion order deliberately scrambled
        create_gauge(deps.as_mut().storage, &gauge(7, 300)).unwrap();
        create_gauge(deps.as_mut().storage, &gauge(2, 100)).unwrap();
        create_gauge(deps.as_mut().storage, &gauge(5, 100)).unwrap();
        create_gauge(deps.as_mut().storage, &gauge(3, 200)).unwrap();

        let all = upcoming_gauge_ids_through(deps.as_ref().storage, Timestamp::from_nanos(400))
            .unwrap();
        assert_eq!(all, vec![2, 5, 3, 7]);

        // the bound is inclusive on the start time
        let due = upcoming_gauge_ids_through(deps.as_ref().storage, Timestamp::from_nanos(200))
            .unwrap();
        assert_eq!(due, vec![2, 5, 3]);
    }

    #[test]
    fn lifecycle_moves_between_indexes() {
        let mut deps = mock_dependencies();
        let g = gauge(1, 100);
        create_gauge(deps.as_mut().storage, &g).unwrap();
        assert!(UPCOMING_GAUGES.has(deps.as_ref().storage, (100, 1)));
        assert!(GAUGES_BY_DENOM.has(deps.as_ref().storage, ("ufoo", 1)));

        begin_distribution(deps.as_mut().storage, Timestamp::from_nanos(100), &g).unwrap();
        assert!(!UPCOMING_GAUGES.has(deps.as_ref().storage, (100, 1)));
        assert!(ACTIVE_GAUGES.has(deps.as_ref().storage, (100, 1)));
        // denom index survives activation
        assert!(GAUGES_BY_DENOM.has(deps.as_ref().storage, ("ufoo", 1)));

        finish_distribution(deps.as_mut().storage, &g).unwrap();
        assert!(!ACTIVE_GAUGES.has(deps.as_ref().storage, (100, 1)));
        assert!(FINISHED_GAUGES.has(deps.as_ref().storage, (100, 1)));
        assert!(!GAUGES_BY_DENOM.has(deps.as_ref().storage, ("ufoo", 1)));
    }

    #[test]
    fn begin_distribution_before_start_time_fails() {
        let mut deps = mock_dependencies();
        let g = gauge(1, 100);
        create_gauge(deps.as_mut().storage, &g).unwrap();

        let err = begin_distribution(deps.as_mut().storage, Timestamp::from_nanos(99), &g)
            .unwrap_err();
        assert_eq!(
            err,
            ContractError::DistributionNotStarted {
                gauge_id: 1,
                block_time: 99,
                start_time: 100,
            }
        );
        // store unchanged
        assert!(UPCOMING_GAUGES.has(deps.as_ref().storage, (100, 1)));
        assert!(!ACTIVE_GAUGES.has(deps.as_ref().storage, (100, 1)));
    }

    #[test]
    fn begin_distribution_twice_fails() {
        let mut deps = mock_dependencies();
        let g = gauge(1, 100);
        create_gauge(deps.as_mut().storage, &g).unwrap();
        begin_distribution(deps.as_mut().storage, Timestamp::from_nanos(150), &g).unwrap();

        let err = begin_distribution(deps.as_mut().storage, Timestamp::from_nanos(150), &g)
            .unwrap_err();
        assert_eq!(err, ContractError::GaugeNotUpcoming(1));
    }

    #[test]
    fn remaining_coins_subtracts_distributed() {
        let mut g = gauge(1, 100);
        g.coins = vec![
            Coin::new(100, "ubar"),
            Coin::new(100, "ufoo"),
        ];
        g.distributed_coins = coins(40, "ufoo");
        let remain = g.remaining_coins().unwrap();
        assert_eq!(remain.amount_of("ufoo").u128(), 60);
        assert_eq!(remain.amount_of("ubar").u128(), 100);
    }

    #[test]
    fn activity_follows_start_time_and_filled_epochs() {
        let mut g = gauge(1, 100);
        let before = Timestamp::from_nanos(99);
        let after = Timestamp::from_nanos(100);

        assert!(g.is_upcoming(before));
        assert!(!g.is_active(before));
        assert!(g.is_active(after));
        assert!(!g.is_finished(after));

        g.filled_epochs = g.num_epochs_paid_over;
        assert!(!g.is_active(after));
        assert!(g.is_finished(after));

        g.is_perpetual = true;
        assert!(g.is_active(after));
    }
}
