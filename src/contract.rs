#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    ensure, to_json_binary, Binary, Coins, Deps, DepsMut, Env, MessageInfo, Response,
};
use cw2::{ensure_from_older_version, set_contract_version};

use crate::error::ContractError;
use crate::hooks::HOOKS;
use crate::msg::{ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::state::{Config, CONFIG};

// version info for migration info
const CONTRACT_NAME: &str = "crates.io:cw-incentives";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    cw_ownable::initialize_owner(deps.storage, deps.api, Some(&msg.owner))?;

    let lockup = deps.api.addr_validate(&msg.lockup)?;
    let epoch_driver = deps.api.addr_validate(&msg.epoch_driver)?;
    CONFIG.save(
        deps.storage,
        &Config {
            lockup: lockup.clone(),
            epoch_driver,
        },
    )?;

    // observers are registered before the first epoch can run
    for hook in msg.hooks.unwrap_or_default() {
        HOOKS.add_hook(deps.storage, deps.api.addr_validate(&hook)?)?;
    }

    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("owner", &msg.owner)
        .add_attribute("lockup", lockup))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::CreateGauge(config) => execute::create_gauge(deps, env, info, config),
        ExecuteMsg::AddToGauge { gauge_id } => execute::add_to_gauge(deps, env, info, gauge_id),
        ExecuteMsg::Distribute {} => execute::distribute(deps, env, info),
        ExecuteMsg::AddHook { addr } => execute::add_hook(deps, info, addr),
        ExecuteMsg::RemoveHook { addr } => execute::remove_hook(deps, info, addr),
        ExecuteMsg::UpdateOwnership(action) => execute::update_ownership(deps, env, info, action),
    }
}

mod execute {
    use cosmwasm_std::CosmosMsg;
    use cw_utils::{nonpayable, PaymentError};

    use super::*;
    use crate::distribution;
    use crate::hooks;
    use crate::lockup::QueryCondition;
    use crate::msg::GaugeConfig;
    use crate::state::{self, Gauge, GaugeId, GAUGES};

    pub fn create_gauge(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        config: GaugeConfig,
    ) -> Result<Response, ContractError> {
        let GaugeConfig {
            is_perpetual,
            distribute_to,
            start_time,
            num_epochs_paid_over,
        } = config;

        match &distribute_to {
            QueryCondition::ByDuration { denom, .. } => {
                ensure!(!denom.is_empty(), ContractError::EmptyDenom {})
            }
            // time-based gauges would never be distributable
            QueryCondition::ByTime { .. } => return Err(ContractError::ByTimeCondition {}),
        }
        if !is_perpetual && num_epochs_paid_over == 0 {
            return Err(ContractError::ZeroEpochsPaidOver {});
        }

        // the attached funds are the budget; this also rejects duplicate
        // denoms and sorts them
        let coins = Coins::try_from(info.funds)?;

        let gauge = Gauge {
            id: state::next_gauge_id(deps.storage)?,
            is_perpetual,
            distribute_to,
            coins: coins.into_vec(),
            start_time: start_time.unwrap_or(env.block.time),
            num_epochs_paid_over,
            filled_epochs: 0,
            distributed_coins: vec![],
        };
        state::create_gauge(deps.storage, &gauge)?;

        Ok(Response::new()
            .add_attribute("action", "create_gauge")
            .add_attribute("gauge_id", gauge.id.to_string()))
    }

    pub fn add_to_gauge(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        gauge_id: GaugeId,
    ) -> Result<Response, ContractError> {
        if info.funds.is_empty() {
            return Err(PaymentError::NoFunds {}.into());
        }

        let mut gauge = GAUGES
            .may_load(deps.storage, gauge_id)?
            .ok_or(ContractError::GaugeMissing(gauge_id))?;
        if gauge.is_finished(env.block.time) {
            return Err(ContractError::GaugeFinished(gauge_id));
        }

        let mut coins = Coins::try_from(gauge.coins)?;
        for coin in info.funds {
            coins.add(coin)?;
        }
        gauge.coins = coins.into_vec();
        GAUGES.save(deps.storage, gauge_id, &gauge)?;

        Ok(Response::new()
            .add_attribute("action", "add_to_gauge")
            .add_attribute("gauge_id", gauge_id.to_string()))
    }

    /// One epoch tick: activate due gauges, pay out all active gauges,
    /// retire the ones that just paid their final epoch
    pub fn distribute(
        mut deps: DepsMut,
        env: Env,
        info: MessageInfo,
    ) -> Result<Response, ContractError> {
        nonpayable(&info)?;
        let config = CONFIG.load(deps.storage)?;
        // distribution mutates every active gauge, so only the epoch
        // driver may trigger it
        if info.sender != config.epoch_driver {
            return Err(ContractError::Unauthorized {});
        }

        let due = state::upcoming_gauge_ids_through(deps.storage, env.block.time)?;
        for gauge in state::load_gauges(deps.storage, &due)? {
            state::begin_distribution(deps.storage, env.block.time, &gauge)?;
        }

        let active_ids = state::active_gauge_ids(deps.storage)?;
        let gauges = state::load_gauges(deps.storage, &active_ids)?;
        let (total, batch) = distribution::distribute(deps.branch(), &config.lockup, gauges)?;

        let epoch_msgs = hooks::after_epoch_distribution(deps.storage)?;

        // reload, the distribution advanced filled_epochs
        let mut finish_msgs: Vec<CosmosMsg> = vec![];
        for gauge in state::load_gauges(deps.storage, &active_ids)? {
            if !gauge.is_perpetual && gauge.filled_epochs >= gauge.num_epochs_paid_over {
                state::finish_distribution(deps.storage, &gauge)?;
                finish_msgs.extend(hooks::after_finish_distribution(deps.storage, gauge.id)?);
            }
        }

        let (bank_msgs, events) = batch.into_messages();

        let mut response = Response::new().add_attribute("action", "distribute");
        if !total.is_empty() {
            response = response.add_attribute("amount", distribution::coins_string(&total));
        }
        Ok(response
            .add_messages(bank_msgs)
            .add_events(events)
            .add_messages(epoch_msgs)
            .add_messages(finish_msgs))
    }

    pub fn add_hook(
        deps: DepsMut,
        info: MessageInfo,
        addr: String,
    ) -> Result<Response, ContractError> {
        nonpayable(&info)?;
        cw_ownable::assert_owner(deps.storage, &info.sender)?;

        let addr = deps.api.addr_validate(&addr)?;
        HOOKS.add_hook(deps.storage, addr.clone())?;

        Ok(Response::new()
            .add_attribute("action", "add_hook")
            .add_attribute("hook", addr))
    }

    pub fn remove_hook(
        deps: DepsMut,
        info: MessageInfo,
        addr: String,
    ) -> Result<Response, ContractError> {
        nonpayable(&info)?;
        cw_ownable::assert_owner(deps.storage, &info.sender)?;

        let addr = deps.api.addr_validate(&addr)?;
        HOOKS.remove_hook(deps.storage, addr.clone())?;

        Ok(Response::new()
            .add_attribute("action", "remove_hook")
            .add_attribute("hook", addr))
    }

    pub fn update_ownership(
        deps: DepsMut,
        env: Env,
        info: MessageInfo,
        action: cw_ownable::Action,
    ) -> Result<Response, ContractError> {
        nonpayable(&info)?;

        let ownership = cw_ownable::update_ownership(deps, &env.block, &info.sender, action)?;
        Ok(Response::new().add_attributes(ownership.into_attributes()))
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> Result<Binary, ContractError> {
    match msg {
        QueryMsg::Config {} => Ok(to_json_binary(&CONFIG.load(deps.storage)?)?),
        QueryMsg::Gauge { id } => Ok(to_json_binary(&query::gauge(deps, id)?)?),
        QueryMsg::ListGauges { start_after, limit } => Ok(to_json_binary(&query::list_gauges(
            deps,
            start_after,
            limit,
        )?)?),
        QueryMsg::ListUpcomingGauges { start_after, limit } => Ok(to_json_binary(
            &query::list_from_index(deps, &crate::state::UPCOMING_GAUGES, start_after, limit)?,
        )?),
        QueryMsg::ListActiveGauges { start_after, limit } => Ok(to_json_binary(
            &query::list_from_index(deps, &crate::state::ACTIVE_GAUGES, start_after, limit)?,
        )?),
        QueryMsg::ListFinishedGauges { start_after, limit } => Ok(to_json_binary(
            &query::list_from_index(deps, &crate::state::FINISHED_GAUGES, start_after, limit)?,
        )?),
        QueryMsg::GaugeIdsByDenom { denom } => {
            Ok(to_json_binary(&query::gauge_ids_by_denom(deps, denom)?)?)
        }
        QueryMsg::ToDistributeCoins {} => {
            Ok(to_json_binary(&query::to_distribute_coins(deps, env)?)?)
        }
        QueryMsg::DistributedCoins {} => Ok(to_json_binary(&query::distributed_coins(deps)?)?),
        QueryMsg::DistributionEstimate { id } => {
            Ok(to_json_binary(&query::distribution_estimate(deps, id)?)?)
        }
        QueryMsg::Hooks {} => Ok(to_json_binary(&HOOKS.query_hooks(deps.storage)?)?),
        QueryMsg::Ownership {} => Ok(to_json_binary(&cw_ownable::get_ownership(deps.storage)?)?),
    }
}

mod query {
    use cosmwasm_std::{Empty, Order, StdResult};
    use cw_storage_plus::{Bound, Map};

    use super::*;
    use crate::distribution;
    use crate::lockup::LockupQuerier;
    use crate::msg::{
        CoinsResponse, DistributionEstimateResponse, GaugeIdsResponse, GaugeResponse,
        ListGaugesResponse,
    };
    use crate::state::{self, Gauge, GaugeId, GAUGES, GAUGES_BY_DENOM, UPCOMING_GAUGES};

    // settings for pagination
    pub const MAX_LIMIT: u32 = 100;
    pub const DEFAULT_LIMIT: u32 = 30;

    fn to_gauge_response(gauge: Gauge) -> GaugeResponse {
        GaugeResponse {
            id: gauge.id,
            is_perpetual: gauge.is_perpetual,
            distribute_to: gauge.distribute_to,
            coins: gauge.coins,
            start_time: gauge.start_time,
            num_epochs_paid_over: gauge.num_epochs_paid_over,
            filled_epochs: gauge.filled_epochs,
            distributed_coins: gauge.distributed_coins,
        }
    }

    pub fn gauge(deps: Deps, id: GaugeId) -> Result<GaugeResponse, ContractError> {
        let gauge = GAUGES
            .may_load(deps.storage, id)?
            .ok_or(ContractError::GaugeMissing(id))?;
        Ok(to_gauge_response(gauge))
    }

    pub fn list_gauges(
        deps: Deps,
        start_after: Option<GaugeId>,
        limit: Option<u32>,
    ) -> Result<ListGaugesResponse, ContractError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
        let start = start_after.map(Bound::exclusive);

        Ok(ListGaugesResponse {
            gauges: GAUGES
                .range(deps.storage, start, None, Order::Ascending)
                .map(|item| {
                    let (_, gauge) = item?;
                    Ok(to_gauge_response(gauge))
                })
                .take(limit)
                .collect::<StdResult<Vec<GaugeResponse>>>()?,
        })
    }

    pub fn list_from_index(
        deps: Deps,
        index: &Map<(u64, GaugeId), Empty>,
        start_after: Option<(u64, GaugeId)>,
        limit: Option<u32>,
    ) -> Result<ListGaugesResponse, ContractError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
        let start = start_after.map(Bound::exclusive);

        let ids = index
            .keys(deps.storage, start, None, Order::Ascending)
            .map(|key| key.map(|(_, id)| id))
            .take(limit)
            .collect::<StdResult<Vec<GaugeId>>>()?;
        Ok(ListGaugesResponse {
            gauges: state::load_gauges(deps.storage, &ids)?
                .into_iter()
                .map(to_gauge_response)
                .collect(),
        })
    }

    pub fn gauge_ids_by_denom(
        deps: Deps,
        denom: String,
    ) -> Result<GaugeIdsResponse, ContractError> {
        Ok(GaugeIdsResponse {
            ids: GAUGES_BY_DENOM
                .prefix(&denom)
                .keys(deps.storage, None, None, Order::Ascending)
                .collect::<StdResult<Vec<GaugeId>>>()?,
        })
    }

    pub fn to_distribute_coins(deps: Deps, env: Env) -> Result<CoinsResponse, ContractError> {
        let mut gauges = state::load_gauges(deps.storage, &state::active_gauge_ids(deps.storage)?)?;
        // plus upcoming gauges starting at or after the current block time
        let upcoming_ids = UPCOMING_GAUGES
            .keys(
                deps.storage,
                Some(Bound::inclusive((env.block.time.nanos(), 0u64))),
                None,
                Order::Ascending,
            )
            .map(|key| key.map(|(_, id)| id))
            .collect::<StdResult<Vec<GaugeId>>>()?;
        gauges.extend(state::load_gauges(deps.storage, &upcoming_ids)?);

        Ok(CoinsResponse {
            coins: distribution::to_distribute_coins(&gauges)?,
        })
    }

    pub fn distributed_coins(deps: Deps) -> Result<CoinsResponse, ContractError> {
        let mut gauges = state::load_gauges(deps.storage, &state::active_gauge_ids(deps.storage)?)?;
        let finished_ids = crate::state::FINISHED_GAUGES
            .keys(deps.storage, None, None, Order::Ascending)
            .map(|key| key.map(|(_, id)| id))
            .collect::<StdResult<Vec<GaugeId>>>()?;
        gauges.extend(state::load_gauges(deps.storage, &finished_ids)?);

        Ok(CoinsResponse {
            coins: distribution::distributed_coins(&gauges)?,
        })
    }

    pub fn distribution_estimate(
        deps: Deps,
        id: GaugeId,
    ) -> Result<DistributionEstimateResponse, ContractError> {
        let config = CONFIG.load(deps.storage)?;
        let gauge = GAUGES
            .may_load(deps.storage, id)?
            .ok_or(ContractError::GaugeMissing(id))?;

        let lockup = LockupQuerier::new(&deps.querier, &config.lockup);
        let locks = lockup.locks_to_distribution(&gauge.distribute_to)?;
        let total_locked = lockup.period_locks_accumulation(&gauge.distribute_to)?;

        let (gauge, coins) = distribution::distribution_est(gauge, &locks, total_locked)?;
        Ok(DistributionEstimateResponse {
            gauge: to_gauge_response(gauge),
            coins,
        })
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    ensure_from_older_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::new())
}
