//! Per-epoch distribution: the math turning a gauge and its qualifying
//! locks into per-owner payouts, and the batch that coalesces those payouts
//! into one transfer and one event per distinct recipient.

use std::collections::HashMap;

use cosmwasm_std::{
    Addr, Api, BankMsg, Coin, Coins, DepsMut, Event, StdError, StdResult, Storage, Uint128,
    Uint256,
};

use crate::error::ContractError;
use crate::lockup::{
    filter_locks_by_min_duration, native_denom, sum_locks_by_denom, LockupQuerier, PeriodLock,
    QueryCondition,
};
use crate::state::{Gauge, GAUGES};

/// Near-zero duration (1ms) used when warming the per-denom lock cache, so
/// one underlying query can serve every gauge paying out to that denom
pub const LOCK_CACHE_MIN_DURATION: u64 = 1_000_000;

/// Pending payouts of one epoch, aggregated by lock owner. Recipients keep
/// their insertion order; the owner table is only ever used for lookups.
#[derive(Default)]
pub struct DistributionBatch {
    owner_to_id: HashMap<String, usize>,
    receivers: Vec<Addr>,
    rewards: Vec<Coins>,
}

impl DistributionBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    /// Adds one lock's rewards to its owner's aggregate. The owner address
    /// is validated on first sight, so a malformed owner fails the epoch
    /// before any transfer is built.
    pub fn add_lock_rewards(
        &mut self,
        api: &dyn Api,
        lock: &PeriodLock,
        rewards: &[Coin],
    ) -> Result<(), ContractError> {
        match self.owner_to_id.get(&lock.owner) {
            Some(&id) => {
                for coin in rewards {
                    self.rewards[id].add(coin.clone())?;
                }
            }
            None => {
                let receiver = api.addr_validate(&lock.owner)?;
                self.owner_to_id.insert(lock.owner.clone(), self.receivers.len());
                self.receivers.push(receiver);
                self.rewards.push(Coins::try_from(rewards.to_vec())?);
            }
        }
        Ok(())
    }

    /// One bank send and one `distribution` event per recipient, in
    /// insertion order
    pub fn into_messages(self) -> (Vec<BankMsg>, Vec<Event>) {
        let mut msgs = Vec::with_capacity(self.receivers.len());
        let mut events = Vec::with_capacity(self.receivers.len());
        for (receiver, rewards) in self.receivers.into_iter().zip(self.rewards) {
            let coins = rewards.into_vec();
            events.push(
                Event::new("distribution")
                    .add_attribute("receiver", &receiver)
                    .add_attribute("amount", coins_string(&coins)),
            );
            msgs.push(BankMsg::Send {
                to_address: receiver.into_string(),
                amount: coins,
            });
        }
        (msgs, events)
    }
}

/// Canonical `"5ufoo,3ubar"` rendering of a sorted coin list
pub fn coins_string(coins: &[Coin]) -> String {
    coins
        .iter()
        .map(|coin| coin.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// reward = remain_amount * lock_amount / (lock_sum * remain_epochs),
// truncated. The widening multiply keeps the numerator exact; the quotient
// always fits back into 128 bits because lock_amount <= lock_sum.
fn lock_share(remain: Uint128, lock_amount: Uint128, divisor: Uint256) -> StdResult<Uint128> {
    Ok(remain
        .full_mul(lock_amount)
        .checked_div(divisor)?
        .try_into()
        .unwrap())
}

/// Runs the distribution logic for one gauge over its filtered locks,
/// accumulating payouts into the batch and persisting the mutated gauge.
/// Returns the coins paid out by this gauge.
pub fn distribute_to_locks(
    storage: &mut dyn Storage,
    api: &dyn Api,
    mut gauge: Gauge,
    locks: &[&PeriodLock],
    batch: &mut DistributionBatch,
) -> Result<Vec<Coin>, ContractError> {
    let denom = native_denom(gauge.distribute_to.denom()).to_string();
    let lock_sum = sum_locks_by_denom(locks.iter().copied(), &denom);
    if lock_sum.is_zero() {
        // nobody qualifies; the gauge is left untouched for future epochs
        return Ok(vec![]);
    }

    let remain_epochs = gauge.remaining_epochs();
    if remain_epochs == 0 {
        return Ok(vec![]);
    }

    let remain = gauge.remaining_coins()?.into_vec();
    let divisor = lock_sum.full_mul(Uint128::from(remain_epochs));

    let mut total = Coins::default();
    for lock in locks {
        let lock_amount = lock.amount_of(&denom);
        let mut rewards = Vec::new();
        // `remain` is sorted by denom, so each lock's rewards are as well
        for coin in &remain {
            let amount = lock_share(coin.amount, lock_amount, divisor)?;
            if !amount.is_zero() {
                rewards.push(Coin {
                    denom: coin.denom.clone(),
                    amount,
                });
            }
        }
        if rewards.is_empty() {
            continue;
        }
        batch.add_lock_rewards(api, lock, &rewards)?;
        for coin in rewards {
            total.add(coin)?;
        }
    }

    gauge.filled_epochs += 1;
    let mut distributed = Coins::try_from(gauge.distributed_coins.clone())?;
    for coin in total.to_vec() {
        distributed.add(coin)?;
    }
    gauge.distributed_coins = distributed.into_vec();
    GAUGES.save(storage, gauge.id, &gauge)?;

    Ok(total.into_vec())
}

/// Distributes one epoch's rewards for all given gauges. Locks are fetched
/// once per denom into a cache local to this call; each gauge filters the
/// cached list down to its own duration condition. Returns the total paid
/// out and the filled batch.
pub fn distribute(
    deps: DepsMut,
    lockup_contract: &Addr,
    gauges: Vec<Gauge>,
) -> Result<(Vec<Coin>, DistributionBatch), ContractError> {
    let lockup = LockupQuerier::new(&deps.querier, lockup_contract);
    let mut batch = DistributionBatch::new();
    let mut locks_by_denom: HashMap<String, Vec<PeriodLock>> = HashMap::new();

    let mut total = Coins::default();
    for gauge in gauges {
        let denom = gauge.distribute_to.denom().to_string();
        if !locks_by_denom.contains_key(&denom) {
            let locks = lockup.locks_to_distribution_with_min_duration(
                &gauge.distribute_to,
                LOCK_CACHE_MIN_DURATION,
            )?;
            locks_by_denom.insert(denom.clone(), locks);
        }
        let duration = match &gauge.distribute_to {
            QueryCondition::ByDuration { duration, .. } => *duration,
            QueryCondition::ByTime { .. } => return Err(ContractError::ByTimeCondition {}),
        };
        let filtered = filter_locks_by_min_duration(&locks_by_denom[&denom], duration);
        let paid = distribute_to_locks(deps.storage, deps.api, gauge, &filtered, &mut batch)?;
        for coin in paid {
            total.add(coin)?;
        }
    }

    Ok((total.into_vec(), batch))
}

/// Previews what the next epoch of `gauge` would pay out to
/// `filtered_locks`, given the total locked amount matching the gauge's
/// condition. Returns the gauge as it would look afterwards together with
/// the estimated coins; nothing is persisted.
pub fn distribution_est(
    mut gauge: Gauge,
    filtered_locks: &[PeriodLock],
    total_locked: Uint128,
) -> Result<(Gauge, Vec<Coin>), ContractError> {
    if total_locked.is_zero() {
        return Ok((gauge, vec![]));
    }
    let remain_epochs = gauge.remaining_epochs();
    if remain_epochs == 0 {
        return Ok((gauge, vec![]));
    }

    let denom = native_denom(gauge.distribute_to.denom()).to_string();

    let mut per_epoch = Coins::default();
    for coin in gauge.remaining_coins()?.into_vec() {
        let amount = coin
            .amount
            .checked_div(Uint128::from(remain_epochs))
            .map_err(StdError::divide_by_zero)?;
        if !amount.is_zero() {
            per_epoch.add(Coin {
                denom: coin.denom,
                amount,
            })?;
        }
    }

    let estimate = if filtered_locks.is_empty() {
        // no filtering requested, estimate the whole next epoch
        per_epoch.clone()
    } else {
        let mut estimate = Coins::default();
        for lock in filtered_locks {
            let lock_amount = lock.amount_of(&denom);
            for coin in per_epoch.to_vec() {
                let amount = lock_share(coin.amount, lock_amount, Uint256::from(total_locked))?;
                if !amount.is_zero() {
                    estimate.add(Coin {
                        denom: coin.denom,
                        amount,
                    })?;
                }
            }
        }
        estimate
    };

    gauge.filled_epochs += 1;
    let mut distributed = Coins::try_from(gauge.distributed_coins.clone())?;
    for coin in per_epoch.into_vec() {
        distributed.add(coin)?;
    }
    gauge.distributed_coins = distributed.into_vec();

    Ok((gauge, estimate.into_vec()))
}

/// Sum of `coins - distributed_coins` over the given gauges
pub fn to_distribute_coins(gauges: &[Gauge]) -> Result<Vec<Coin>, ContractError> {
    let mut total = Coins::default();
    for gauge in gauges {
        for coin in gauge.remaining_coins()?.into_vec() {
            total.add(coin)?;
        }
    }
    Ok(total.into_vec())
}

/// Sum of `distributed_coins` over the given gauges
pub fn distributed_coins(gauges: &[Gauge]) -> Result<Vec<Coin>, ContractError> {
    let mut total = Coins::default();
    for gauge in gauges {
        for coin in &gauge.distributed_coins {
            total.add(coin.clone())?;
        }
    }
    Ok(total.into_vec())
}

#[cfg(test)]
mod tests {
    use cosmwasm_std::testing::mock_dependencies;
    use cosmwasm_std::{coin, coins, Timestamp};

    use super::*;

    fn gauge(coins: Vec<Coin>, num_epochs: u64, is_perpetual: bool) -> Gauge {
        Gauge {
            id: 1,
            is_perpetual,
            distribute_to: QueryCondition::ByDuration {
                denom: "token".to_string(),
                duration: 1000,
            },
            coins,
            start_time: Timestamp::from_nanos(0),
            num_epochs_paid_over: num_epochs,
            filled_epochs: 0,
            distributed_coins: vec![],
        }
    }

    fn lock(id: u64, owner: &str, amount: u128) -> PeriodLock {
        PeriodLock {
            id,
            owner: owner.to_string(),
            duration: 1000,
            end_time: Timestamp::from_nanos(0),
            coins: coins(amount, "token"),
        }
    }

    #[test]
    fn equal_locks_split_the_epoch_slice() {
        let mut deps = mock_dependencies();
        let mut batch = DistributionBatch::new();
        let locks = [lock(1, "alice", 1), lock(2, "bob", 1)];
        let refs: Vec<&PeriodLock> = locks.iter().collect();

        let paid = distribute_to_locks(
            &mut deps.storage,
            &deps.api,
            gauge(coins(100, "ufoo"), 10, false),
            &refs,
            &mut batch,
        )
        .unwrap();

        assert_eq!(paid, coins(10, "ufoo"));
        assert_eq!(batch.len(), 2);

        let saved = GAUGES.load(&deps.storage, 1).unwrap();
        assert_eq!(saved.filled_epochs, 1);
        assert_eq!(saved.distributed_coins, coins(10, "ufoo"));

        let (msgs, events) = batch.into_messages();
        assert_eq!(
            msgs,
            vec![
                BankMsg::Send {
                    to_address: "alice".to_string(),
                    amount: coins(5, "ufoo"),
                },
                BankMsg::Send {
                    to_address: "bob".to_string(),
                    amount: coins(5, "ufoo"),
                },
            ]
        );
        assert_eq!(events[0].ty, "distribution");
        assert_eq!(events[0].attributes[0].value, "alice");
        assert_eq!(events[0].attributes[1].value, "5ufoo");
        assert_eq!(events[1].attributes[0].value, "bob");
    }

    #[test]
    fn truncation_leaves_dust_in_the_gauge() {
        let mut deps = mock_dependencies();
        let mut batch = DistributionBatch::new();
        let locks = [lock(1, "alice", 1)];
        let refs: Vec<&PeriodLock> = locks.iter().collect();

        // 7 / (1 * 3) = 2, 1ufoo of dust carries forward
        let paid = distribute_to_locks(
            &mut deps.storage,
            &deps.api,
            gauge(coins(7, "ufoo"), 3, false),
            &refs,
            &mut batch,
        )
        .unwrap();

        assert_eq!(paid, coins(2, "ufoo"));
        let saved = GAUGES.load(&deps.storage, 1).unwrap();
        assert_eq!(saved.filled_epochs, 1);
        assert_eq!(saved.distributed_coins, coins(2, "ufoo"));
        assert_eq!(
            saved.remaining_coins().unwrap().amount_of("ufoo").u128(),
            5
        );
    }

    #[test]
    fn perpetual_gauge_pays_whole_remainder_pro_rata() {
        let mut deps = mock_dependencies();
        let mut batch = DistributionBatch::new();
        let locks = [lock(1, "alice", 1), lock(2, "bob", 2), lock(3, "carol", 3)];
        let refs: Vec<&PeriodLock> = locks.iter().collect();

        let paid = distribute_to_locks(
            &mut deps.storage,
            &deps.api,
            gauge(coins(100, "ufoo"), 0, true),
            &refs,
            &mut batch,
        )
        .unwrap();

        // 100*1/6=16, 100*2/6=33, 100*3/6=50; 1ufoo of dust remains
        assert_eq!(paid, coins(99, "ufoo"));
        let (msgs, _) = batch.into_messages();
        assert_eq!(
            msgs,
            vec![
                BankMsg::Send {
                    to_address: "alice".to_string(),
                    amount: coins(16, "ufoo"),
                },
                BankMsg::Send {
                    to_address: "bob".to_string(),
                    amount: coins(33, "ufoo"),
                },
                BankMsg::Send {
                    to_address: "carol".to_string(),
                    amount: coins(50, "ufoo"),
                },
            ]
        );
        let saved = GAUGES.load(&deps.storage, 1).unwrap();
        assert_eq!(saved.filled_epochs, 1);
    }

    #[test]
    fn no_qualifying_locks_is_a_noop() {
        let mut deps = mock_dependencies();
        let mut batch = DistributionBatch::new();

        let paid = distribute_to_locks(
            &mut deps.storage,
            &deps.api,
            gauge(coins(100, "ufoo"), 10, false),
            &[],
            &mut batch,
        )
        .unwrap();

        assert!(paid.is_empty());
        assert!(batch.is_empty());
        // short-circuits before touching filled_epochs, nothing persisted
        assert!(GAUGES.may_load(&deps.storage, 1).unwrap().is_none());
    }

    #[test]
    fn exhausted_gauge_is_a_noop() {
        let mut deps = mock_dependencies();
        let mut batch = DistributionBatch::new();
        let locks = [lock(1, "alice", 1)];
        let refs: Vec<&PeriodLock> = locks.iter().collect();

        let mut g = gauge(coins(100, "ufoo"), 3, false);
        g.filled_epochs = 3;
        let paid =
            distribute_to_locks(&mut deps.storage, &deps.api, g, &refs, &mut batch).unwrap();

        assert!(paid.is_empty());
        assert!(batch.is_empty());
    }

    #[test]
    fn batch_coalesces_by_owner_in_insertion_order() {
        let deps = mock_dependencies();
        let mut batch = DistributionBatch::new();
        let api = &deps.api;

        batch
            .add_lock_rewards(api, &lock(1, "bob", 1), &coins(5, "ufoo"))
            .unwrap();
        batch
            .add_lock_rewards(api, &lock(2, "alice", 1), &coins(3, "ufoo"))
            .unwrap();
        batch
            .add_lock_rewards(api, &lock(3, "bob", 1), &coins(2, "ubar"))
            .unwrap();
        batch
            .add_lock_rewards(api, &lock(4, "bob", 1), &coins(4, "ufoo"))
            .unwrap();

        assert_eq!(batch.len(), 2);
        let (msgs, events) = batch.into_messages();
        assert_eq!(
            msgs,
            vec![
                BankMsg::Send {
                    to_address: "bob".to_string(),
                    amount: vec![coin(2, "ubar"), coin(9, "ufoo")],
                },
                BankMsg::Send {
                    to_address: "alice".to_string(),
                    amount: coins(3, "ufoo"),
                },
            ]
        );
        assert_eq!(events[0].attributes[1].value, "2ubar,9ufoo");
    }

    #[test]
    fn estimate_without_filter_is_the_epoch_slice() {
        let g = gauge(coins(90, "ufoo"), 3, false);
        let (preview, est) = distribution_est(g, &[], Uint128::new(1000)).unwrap();
        assert_eq!(est, coins(30, "ufoo"));
        assert_eq!(preview.filled_epochs, 1);
        assert_eq!(preview.distributed_coins, coins(30, "ufoo"));
    }

    #[test]
    fn estimate_scales_down_with_total_locked() {
        let locks = [lock(1, "alice", 10)];

        let (_, small_pool) =
            distribution_est(gauge(coins(100, "ufoo"), 1, false), &locks, Uint128::new(20))
                .unwrap();
        let (_, large_pool) =
            distribution_est(gauge(coins(100, "ufoo"), 1, false), &locks, Uint128::new(40))
                .unwrap();

        assert_eq!(small_pool, coins(50, "ufoo"));
        assert_eq!(large_pool, coins(25, "ufoo"));
    }

    #[test]
    fn estimate_with_nothing_locked_is_empty() {
        let g = gauge(coins(100, "ufoo"), 2, false);
        let (preview, est) = distribution_est(g, &[], Uint128::zero()).unwrap();
        assert!(est.is_empty());
        assert_eq!(preview.filled_epochs, 0);
    }

    #[test]
    fn module_report_sums() {
        let mut g1 = gauge(coins(100, "ufoo"), 10, false);
        g1.distributed_coins = coins(40, "ufoo");
        let mut g2 = gauge(vec![coin(50, "ubar"), coin(10, "ufoo")], 5, false);
        g2.distributed_coins = coins(20, "ubar");

        let to_distribute = to_distribute_coins(&[g1.clone(), g2.clone()]).unwrap();
        assert_eq!(to_distribute, vec![coin(30, "ubar"), coin(70, "ufoo")]);

        let distributed = distributed_coins(&[g1, g2]).unwrap();
        assert_eq!(distributed, vec![coin(20, "ubar"), coin(40, "ufoo")]);
    }

    #[test]
    fn coin_strings_join_sorted_denoms() {
        assert_eq!(coins_string(&[]), "");
        assert_eq!(
            coins_string(&[coin(2, "ubar"), coin(9, "ufoo")]),
            "2ubar,9ufoo"
        );
    }
}
