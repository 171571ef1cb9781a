use cosmwasm_std::{coin, coins, Timestamp};

use super::suite::{
    distribution_events, gauge_config, period_lock, perpetual_gauge_config, SuiteBuilder,
};
use crate::error::ContractError;
use crate::lockup::QueryCondition;
use crate::msg::GaugeConfig;

const DAY: u64 = 86_400_000_000_000;
const WEEK: u64 = 7 * DAY;

#[test]
fn equal_locks_split_the_epoch_slice() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![
            period_lock(1, "alice", WEEK, 1, "token"),
            period_lock(2, "bob", WEEK, 1, "token"),
        ])
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 10), &coins(100, "ufoo"))
        .unwrap();

    let response = suite.distribute().unwrap();

    assert_eq!(suite.balance("alice", "ufoo"), 5);
    assert_eq!(suite.balance("bob", "ufoo"), 5);
    assert_eq!(
        distribution_events(&response),
        vec![
            ("alice".to_string(), "5ufoo".to_string()),
            ("bob".to_string(), "5ufoo".to_string()),
        ]
    );

    let gauge = suite.query_gauge(1).unwrap();
    assert_eq!(gauge.filled_epochs, 1);
    assert_eq!(gauge.distributed_coins, coins(10, "ufoo"));
}

#[test]
fn dust_carries_forward_until_the_final_epoch() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 3), &coins(7, "ufoo"))
        .unwrap();

    // 7 / 3 = 2, the 1ufoo remainder stays in the gauge
    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 2);
    assert_eq!(
        suite.query_gauge(1).unwrap().distributed_coins,
        coins(2, "ufoo")
    );

    // 5 / 2 = 2
    suite.advance_time(86_400);
    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 4);

    // the last epoch drains the remainder, nothing is lost to rounding
    suite.advance_time(86_400);
    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 7);

    let gauge = suite.query_gauge(1).unwrap();
    assert_eq!(gauge.filled_epochs, 3);
    assert_eq!(gauge.distributed_coins, coins(7, "ufoo"));
    assert_eq!(suite.query_finished_gauges().unwrap()[0].id, 1);
}

#[test]
fn perpetual_gauge_distributes_pro_rata() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![
            period_lock(1, "alice", WEEK, 1, "token"),
            period_lock(2, "bob", WEEK, 2, "token"),
            period_lock(3, "carol", WEEK, 3, "token"),
        ])
        .build();

    suite
        .create_gauge(perpetual_gauge_config("token", WEEK), &coins(100, "ufoo"))
        .unwrap();

    suite.distribute().unwrap();

    assert_eq!(suite.balance("alice", "ufoo"), 16);
    assert_eq!(suite.balance("bob", "ufoo"), 33);
    assert_eq!(suite.balance("carol", "ufoo"), 50);

    // 1ufoo of truncation dust stays behind; the gauge remains active
    let gauge = suite.query_gauge(1).unwrap();
    assert_eq!(gauge.filled_epochs, 1);
    assert_eq!(gauge.distributed_coins, coins(99, "ufoo"));
    assert_eq!(suite.query_active_gauges().unwrap().len(), 1);
}

#[test]
fn same_owner_across_gauges_gets_one_transfer() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 10), &coins(100, "ufoo"))
        .unwrap();
    suite
        .create_gauge(gauge_config("token", WEEK, 5), &coins(50, "ufoo"))
        .unwrap();

    let response = suite.distribute().unwrap();

    // 100/10 from the first gauge, 50/5 from the second, in one payout
    assert_eq!(suite.balance("alice", "ufoo"), 20);
    assert_eq!(
        distribution_events(&response),
        vec![("alice".to_string(), "20ufoo".to_string())]
    );
}

#[test]
fn duration_filter_and_recipient_order() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![
            period_lock(1, "alice", DAY, 1, "token"),
            period_lock(2, "bob", WEEK, 1, "token"),
        ])
        .build();

    // the week gauge only reaches bob, the day gauge reaches both
    suite
        .create_gauge(perpetual_gauge_config("token", WEEK), &coins(100, "ufoo"))
        .unwrap();
    suite
        .create_gauge(perpetual_gauge_config("token", DAY), &coins(60, "ufoo"))
        .unwrap();

    let response = suite.distribute().unwrap();

    assert_eq!(suite.balance("alice", "ufoo"), 30);
    assert_eq!(suite.balance("bob", "ufoo"), 130);
    // bob entered the batch first (first gauge), so his aggregated payout
    // is emitted first
    assert_eq!(
        distribution_events(&response),
        vec![
            ("bob".to_string(), "130ufoo".to_string()),
            ("alice".to_string(), "30ufoo".to_string()),
        ]
    );
}

#[test]
fn gauge_finishes_after_its_last_epoch() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .with_hook_receiver()
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 2), &coins(10, "ufoo"))
        .unwrap();

    suite.distribute().unwrap();
    assert_eq!(suite.query_active_gauges().unwrap().len(), 1);
    let counts = suite.query_hook_counts().unwrap();
    assert_eq!(counts.epochs, 1);
    assert_eq!(counts.finished, Vec::<u64>::new());

    suite.advance_time(86_400);
    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 10);

    // the gauge paid its final epoch and moved to the finished set
    assert!(suite.query_active_gauges().unwrap().is_empty());
    assert_eq!(suite.query_finished_gauges().unwrap()[0].id, 1);
    assert_eq!(suite.query_gauge_ids_by_denom("token").unwrap(), Vec::<u64>::new());
    let counts = suite.query_hook_counts().unwrap();
    assert_eq!(counts.epochs, 2);
    assert_eq!(counts.finished, vec![1]);

    // further epochs are no-ops for it
    suite.advance_time(86_400);
    let response = suite.distribute().unwrap();
    assert!(distribution_events(&response).is_empty());
    assert_eq!(suite.balance("alice", "ufoo"), 10);
    assert_eq!(suite.query_hook_counts().unwrap().epochs, 3);

    // finished gauges remain the historical record
    assert_eq!(suite.query_distributed_coins().unwrap(), coins(10, "ufoo"));
}

#[test]
fn distribution_waits_for_the_start_time() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .build();

    let start_time = suite.block_time().plus_seconds(1_000);
    suite
        .create_gauge(
            GaugeConfig {
                start_time: Some(start_time),
                ..gauge_config("token", WEEK, 10)
            },
            &coins(100, "ufoo"),
        )
        .unwrap();

    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 0);
    assert_eq!(suite.query_upcoming_gauges().unwrap()[0].id, 1);
    assert!(suite.query_active_gauges().unwrap().is_empty());

    // once the start time passes, the same tick activates and pays
    suite.advance_time(1_000);
    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 10);
    assert_eq!(suite.query_active_gauges().unwrap()[0].id, 1);
    assert!(suite.query_upcoming_gauges().unwrap().is_empty());
}

#[test]
fn only_the_epoch_driver_may_distribute() {
    let mut suite = SuiteBuilder::new().build();

    let err = suite.distribute_as("alice").unwrap_err();
    assert_eq!(ContractError::Unauthorized {}, err.downcast().unwrap());
}

#[test]
fn malformed_lock_owner_aborts_the_epoch() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![
            period_lock(1, "alice", WEEK, 1, "token"),
            // too short to be a valid address
            period_lock(2, "x", WEEK, 1, "token"),
        ])
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 10), &coins(100, "ufoo"))
        .unwrap();

    suite.distribute().unwrap_err();

    // the whole transition rolled back, nobody got paid
    assert_eq!(suite.balance("alice", "ufoo"), 0);
    assert_eq!(suite.query_gauge(1).unwrap().filled_epochs, 0);
}

#[test]
fn module_reports_track_distribution() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 10), &coins(100, "ufoo"))
        .unwrap();

    assert_eq!(suite.query_to_distribute_coins().unwrap(), coins(100, "ufoo"));
    assert!(suite.query_distributed_coins().unwrap().is_empty());

    suite.distribute().unwrap();

    assert_eq!(suite.query_to_distribute_coins().unwrap(), coins(90, "ufoo"));
    assert_eq!(suite.query_distributed_coins().unwrap(), coins(10, "ufoo"));
}

#[test]
fn estimate_previews_without_mutating() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 10, "token")])
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 3), &coins(90, "ufoo"))
        .unwrap();

    let estimate = suite.query_distribution_estimate(1).unwrap();
    assert_eq!(estimate.coins, coins(30, "ufoo"));
    assert_eq!(estimate.gauge.filled_epochs, 1);
    assert_eq!(estimate.gauge.distributed_coins, coins(30, "ufoo"));

    // the preview left no trace
    let gauge = suite.query_gauge(1).unwrap();
    assert_eq!(gauge.filled_epochs, 0);
    assert!(gauge.distributed_coins.is_empty());

    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 30);
}

#[test]
fn topping_up_extends_the_payout() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .build();

    suite
        .create_gauge(gauge_config("token", WEEK, 5), &coins(50, "ufoo"))
        .unwrap();

    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 10);

    suite.add_to_gauge(1, &coins(50, "ufoo")).unwrap();
    assert_eq!(suite.query_gauge(1).unwrap().coins, coins(100, "ufoo"));

    // 90 remaining over 4 epochs, truncated
    suite.advance_time(86_400);
    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 32);
}

#[test]
fn mixed_denom_budget_pays_sorted_coin_sets() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .build();

    suite
        .create_gauge(
            perpetual_gauge_config("token", WEEK),
            &[coin(5, "ubar"), coin(9, "ufoo")],
        )
        .unwrap();

    let response = suite.distribute().unwrap();

    assert_eq!(suite.balance("alice", "ubar"), 5);
    assert_eq!(suite.balance("alice", "ufoo"), 9);
    assert_eq!(
        distribution_events(&response),
        vec![("alice".to_string(), "5ubar,9ufoo".to_string())]
    );
}

#[test]
fn gauges_without_qualifying_locks_are_untouched() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", DAY, 1, "token")])
        .build();

    // requires a week, the only lock is a day
    suite
        .create_gauge(gauge_config("token", WEEK, 10), &coins(100, "ufoo"))
        .unwrap();

    let response = suite.distribute().unwrap();
    assert!(distribution_events(&response).is_empty());

    // the epoch did not consume the gauge
    let gauge = suite.query_gauge(1).unwrap();
    assert_eq!(gauge.filled_epochs, 0);
    assert!(gauge.distributed_coins.is_empty());

    // a qualifying lock appearing later gets the full schedule
    suite.set_locks(vec![period_lock(2, "bob", WEEK, 1, "token")]);
    suite.advance_time(86_400);
    suite.distribute().unwrap();
    assert_eq!(suite.balance("bob", "ufoo"), 10);
}

#[test]
fn synthetic_denoms_collapse_to_the_native_one() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 4, "token")])
        .build();

    // the gauge targets a synthetic superfluid denom; rewards math must
    // fall back to the underlying token
    suite
        .create_gauge(
            perpetual_gauge_config("tokensuperbonding/valoper123", WEEK),
            &coins(100, "ufoo"),
        )
        .unwrap();

    suite.distribute().unwrap();
    assert_eq!(suite.balance("alice", "ufoo"), 100);
}

#[test]
fn by_time_gauges_cannot_be_created() {
    let mut suite = SuiteBuilder::new().build();

    let err = suite
        .create_gauge(
            GaugeConfig {
                is_perpetual: false,
                distribute_to: QueryCondition::ByTime {
                    denom: "token".to_string(),
                    timestamp: Timestamp::from_seconds(1),
                },
                start_time: None,
                num_epochs_paid_over: 10,
            },
            &coins(100, "ufoo"),
        )
        .unwrap_err();
    assert_eq!(ContractError::ByTimeCondition {}, err.downcast().unwrap());
}
