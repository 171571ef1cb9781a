use cosmwasm_std::coins;
use cw_ownable::OwnershipError;
use cw_utils::PaymentError;

use super::suite::{gauge_config, period_lock, SuiteBuilder};
use crate::error::ContractError;
use crate::lockup::QueryCondition;
use crate::msg::GaugeConfig;

const WEEK: u64 = 7 * 86_400_000_000_000;

#[test]
fn create_gauge() {
    let mut suite = SuiteBuilder::new().build();

    suite
        .create_gauge(gauge_config("token", WEEK, 10), &coins(100, "ufoo"))
        .unwrap();

    let gauge = suite.query_gauge(1).unwrap();
    assert_eq!(gauge.id, 1);
    assert!(!gauge.is_perpetual);
    assert_eq!(
        gauge.distribute_to,
        QueryCondition::ByDuration {
            denom: "token".to_string(),
            duration: WEEK,
        }
    );
    assert_eq!(gauge.coins, coins(100, "ufoo"));
    assert_eq!(gauge.start_time, suite.block_time());
    assert_eq!(gauge.num_epochs_paid_over, 10);
    assert_eq!(gauge.filled_epochs, 0);
    assert!(gauge.distributed_coins.is_empty());

    // a fresh gauge sits in the upcoming set until the first epoch runs
    assert_eq!(suite.query_upcoming_gauges().unwrap()[0].id, 1);
    assert!(suite.query_active_gauges().unwrap().is_empty());
    assert_eq!(suite.query_gauge_ids_by_denom("token").unwrap(), vec![1]);
}

#[test]
fn gauge_ids_are_sequential() {
    let mut suite = SuiteBuilder::new().build();

    for _ in 0..3 {
        suite
            .create_gauge(gauge_config("token", WEEK, 10), &coins(10, "ufoo"))
            .unwrap();
    }

    let gauges = suite.query_gauges(&crate::msg::QueryMsg::ListGauges {
        start_after: None,
        limit: None,
    });
    let ids: Vec<_> = gauges.unwrap().iter().map(|gauge| gauge.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    // pagination picks up after the given id
    let gauges = suite.query_gauges(&crate::msg::QueryMsg::ListGauges {
        start_after: Some(1),
        limit: Some(1),
    });
    let ids: Vec<_> = gauges.unwrap().iter().map(|gauge| gauge.id).collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn create_gauge_validation() {
    let mut suite = SuiteBuilder::new().build();

    let err = suite
        .create_gauge(gauge_config("token", WEEK, 0), &coins(100, "ufoo"))
        .unwrap_err();
    assert_eq!(ContractError::ZeroEpochsPaidOver {}, err.downcast().unwrap());

    let err = suite
        .create_gauge(gauge_config("", WEEK, 10), &coins(100, "ufoo"))
        .unwrap_err();
    assert_eq!(ContractError::EmptyDenom {}, err.downcast().unwrap());

    // perpetual gauges ignore the epoch count
    suite
        .create_gauge(
            GaugeConfig {
                is_perpetual: true,
                num_epochs_paid_over: 0,
                ..gauge_config("token", WEEK, 0)
            },
            &coins(100, "ufoo"),
        )
        .unwrap();
}

#[test]
fn add_to_gauge_requirements() {
    let mut suite = SuiteBuilder::new()
        .with_locks(vec![period_lock(1, "alice", WEEK, 1, "token")])
        .build();

    let err = suite.add_to_gauge(5, &coins(10, "ufoo")).unwrap_err();
    assert_eq!(ContractError::GaugeMissing(5), err.downcast().unwrap());

    suite
        .create_gauge(gauge_config("token", WEEK, 1), &coins(10, "ufoo"))
        .unwrap();

    let err = suite.add_to_gauge(1, &[]).unwrap_err();
    assert_eq!(
        ContractError::Payment(PaymentError::NoFunds {}),
        err.downcast().unwrap()
    );

    // topping up an upcoming gauge is fine
    suite.add_to_gauge(1, &coins(5, "ufoo")).unwrap();
    assert_eq!(suite.query_gauge(1).unwrap().coins, coins(15, "ufoo"));

    // a single-epoch gauge finishes after one distribution and cannot be
    // topped up any more
    suite.distribute().unwrap();
    let err = suite.add_to_gauge(1, &coins(5, "ufoo")).unwrap_err();
    assert_eq!(ContractError::GaugeFinished(1), err.downcast().unwrap());
}

#[test]
fn hook_registration() {
    let mut suite = SuiteBuilder::new().with_hook_receiver().build();
    let receiver = suite.hook_receiver.clone().unwrap();

    // the instantiation hook is registered
    assert_eq!(suite.query_hooks().unwrap(), vec![receiver.to_string()]);

    let err = suite.add_hook("alice", "watcher").unwrap_err();
    assert_eq!(
        ContractError::Ownership(OwnershipError::NotOwner),
        err.downcast().unwrap()
    );

    let owner = suite.owner.clone();
    suite.add_hook(owner.clone(), "watcher").unwrap();
    assert_eq!(
        suite.query_hooks().unwrap(),
        vec![receiver.to_string(), "watcher".to_string()]
    );

    let err = suite.add_hook(owner.clone(), "watcher").unwrap_err();
    assert_eq!(
        ContractError::HookAlreadyRegistered {},
        err.downcast().unwrap()
    );

    let err = suite.remove_hook(owner.clone(), "nobody").unwrap_err();
    assert_eq!(ContractError::HookNotRegistered {}, err.downcast().unwrap());

    suite.remove_hook(owner, "watcher").unwrap();
    assert_eq!(suite.query_hooks().unwrap(), vec![receiver.to_string()]);
}
