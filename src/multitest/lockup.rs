//! Lockup contract mocked in tests. It is instantiated with the full lock
//! set and answers the gauge queries by filtering that set the way the real
//! lockup module would.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{
    to_json_binary, Binary, Deps, DepsMut, Empty, Env, MessageInfo, Response, StdError, StdResult,
    Timestamp, Uint128,
};
use cw_multi_test::{Contract, ContractWrapper};
use cw_storage_plus::Item;

use crate::lockup::{
    native_denom, AccumulationResponse, LockupQueryMsg, LocksResponse, PeriodLock, QueryCondition,
};

#[cw_serde]
pub struct InstantiateMsg {
    pub locks: Vec<PeriodLock>,
}

#[cw_serde]
pub enum ExecuteMsg {
    SetLocks { locks: Vec<PeriodLock> },
}

const LOCKS: Item<Vec<PeriodLock>> = Item::new("locks");

fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, StdError> {
    LOCKS.save(deps.storage, &msg.locks)?;
    Ok(Response::default())
}

fn execute(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, StdError> {
    match msg {
        ExecuteMsg::SetLocks { locks } => LOCKS.save(deps.storage, &locks)?,
    }
    Ok(Response::new())
}

fn holds_denom(lock: &PeriodLock, denom: &str) -> bool {
    let native = native_denom(denom);
    lock.coins.iter().any(|coin| coin.denom == native)
}

fn past_time(lock: &PeriodLock, timestamp: Timestamp) -> bool {
    lock.is_unlocking() && lock.end_time <= timestamp
}

fn query(deps: Deps, _env: Env, msg: LockupQueryMsg) -> StdResult<Binary> {
    let locks = LOCKS.load(deps.storage)?;
    match msg {
        LockupQueryMsg::LocksLongerThanDuration { denom, duration } => {
            to_json_binary(&LocksResponse {
                locks: locks
                    .into_iter()
                    .filter(|lock| lock.duration >= duration && holds_denom(lock, &denom))
                    .collect(),
            })
        }
        LockupQueryMsg::LocksPastTime { denom, timestamp } => to_json_binary(&LocksResponse {
            locks: locks
                .into_iter()
                .filter(|lock| past_time(lock, timestamp) && holds_denom(lock, &denom))
                .collect(),
        }),
        LockupQueryMsg::PeriodLocksAccumulation { condition } => {
            let denom = native_denom(condition.denom()).to_string();
            let amount = locks
                .iter()
                .filter(|lock| match &condition {
                    QueryCondition::ByDuration { duration, .. } => lock.duration >= *duration,
                    QueryCondition::ByTime { timestamp, .. } => past_time(lock, *timestamp),
                })
                .fold(Uint128::zero(), |sum, lock| sum + lock.amount_of(&denom));
            to_json_binary(&AccumulationResponse { amount })
        }
    }
}

pub fn contract() -> Box<dyn Contract<Empty>> {
    let contract = ContractWrapper::new_with_empty(execute, instantiate, query);
    Box::new(contract)
}
