use anyhow::Result as AnyResult;
use cosmwasm_std::{coins, Addr, Coin, StdResult, Timestamp};
use cw_multi_test::{App, AppResponse, BankSudo, ContractWrapper, Executor, SudoMsg};

use super::lockup::{
    contract as lockup_contract, ExecuteMsg as LockupExecuteMsg,
    InstantiateMsg as LockupInstantiateMsg,
};
use crate::hooks::HooksResponse;
use crate::lockup::{PeriodLock, QueryCondition};
use crate::msg::{
    CoinsResponse, DistributionEstimateResponse, ExecuteMsg, GaugeConfig, GaugeIdsResponse,
    GaugeResponse, InstantiateMsg, ListGaugesResponse, QueryMsg,
};
use crate::state::GaugeId;

pub const BLOCK_TIME: u64 = 5;

pub fn period_lock(id: u64, owner: &str, duration: u64, amount: u128, denom: &str) -> PeriodLock {
    PeriodLock {
        id,
        owner: owner.to_string(),
        duration,
        end_time: Timestamp::from_nanos(0),
        coins: coins(amount, denom),
    }
}

pub fn gauge_config(denom: &str, duration: u64, num_epochs_paid_over: u64) -> GaugeConfig {
    GaugeConfig {
        is_perpetual: false,
        distribute_to: QueryCondition::ByDuration {
            denom: denom.to_string(),
            duration,
        },
        start_time: None,
        num_epochs_paid_over,
    }
}

pub fn perpetual_gauge_config(denom: &str, duration: u64) -> GaugeConfig {
    GaugeConfig {
        is_perpetual: true,
        distribute_to: QueryCondition::ByDuration {
            denom: denom.to_string(),
            duration,
        },
        start_time: None,
        num_epochs_paid_over: 1,
    }
}

/// `(receiver, amount)` attributes of the `distribution` events of a
/// response, in emission order
pub fn distribution_events(response: &AppResponse) -> Vec<(String, String)> {
    response
        .events
        .iter()
        .filter(|event| event.ty == "wasm-distribution")
        .map(|event| {
            let attribute = |key: &str| {
                event
                    .attributes
                    .iter()
                    .find(|attribute| attribute.key == key)
                    .unwrap()
                    .value
                    .clone()
            };
            (attribute("receiver"), attribute("amount"))
        })
        .collect()
}

mod hook_receiver {
    //! Observer contract counting the lifecycle notifications it receives

    use cosmwasm_schema::cw_serde;
    use cosmwasm_std::{
        to_json_binary, Binary, Deps, DepsMut, Empty, Env, MessageInfo, Response, StdError,
        StdResult,
    };
    use cw_multi_test::{Contract, ContractWrapper};
    use cw_storage_plus::Item;

    use crate::hooks::{IncentivesHookExecuteMsg, IncentivesHookMsg};

    const EPOCHS: Item<u64> = Item::new("epochs");
    const FINISHED: Item<Vec<u64>> = Item::new("finished");

    #[cw_serde]
    pub enum QueryMsg {
        Counts {},
    }

    #[cw_serde]
    pub struct CountsResponse {
        pub epochs: u64,
        pub finished: Vec<u64>,
    }

    fn instantiate(
        deps: DepsMut,
        _env: Env,
        _info: MessageInfo,
        _msg: Empty,
    ) -> Result<Response, StdError> {
        EPOCHS.save(deps.storage, &0)?;
        FINISHED.save(deps.storage, &vec![])?;
        Ok(Response::default())
    }

    fn execute(
        deps: DepsMut,
        _env: Env,
        _info: MessageInfo,
        msg: IncentivesHookExecuteMsg,
    ) -> Result<Response, StdError> {
        let IncentivesHookExecuteMsg::IncentivesHook(msg) = msg;
        match msg {
            IncentivesHookMsg::AfterEpochDistribution {} => {
                EPOCHS.update(deps.storage, |count| -> StdResult<_> { Ok(count + 1) })?;
            }
            IncentivesHookMsg::AfterFinishDistribution { gauge_id } => {
                FINISHED.update(deps.storage, |mut ids| -> StdResult<_> {
                    ids.push(gauge_id);
                    Ok(ids)
                })?;
            }
        }
        Ok(Response::new())
    }

    fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<Binary> {
        match msg {
            QueryMsg::Counts {} => to_json_binary(&CountsResponse {
                epochs: EPOCHS.load(deps.storage)?,
                finished: FINISHED.load(deps.storage)?,
            }),
        }
    }

    pub fn contract() -> Box<dyn Contract<Empty>> {
        let contract = ContractWrapper::new_with_empty(execute, instantiate, query);
        Box::new(contract)
    }
}

pub use hook_receiver::CountsResponse;

#[derive(Debug, Default)]
pub struct SuiteBuilder {
    locks: Vec<PeriodLock>,
    with_hook_receiver: bool,
}

impl SuiteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locks(mut self, locks: Vec<PeriodLock>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_hook_receiver(mut self) -> Self {
        self.with_hook_receiver = true;
        self
    }

    #[track_caller]
    pub fn build(self) -> Suite {
        let mut app = App::default();
        let owner = Addr::unchecked("owner");
        let epoch_driver = Addr::unchecked("epochs");

        let lockup_code_id = app.store_code(lockup_contract());
        let lockup = app
            .instantiate_contract(
                lockup_code_id,
                owner.clone(),
                &LockupInstantiateMsg { locks: self.locks },
                &[],
                "lockup",
                None,
            )
            .unwrap();

        let hook_receiver = if self.with_hook_receiver {
            let code_id = app.store_code(hook_receiver::contract());
            Some(
                app.instantiate_contract(
                    code_id,
                    owner.clone(),
                    &cosmwasm_std::Empty {},
                    &[],
                    "hook receiver",
                    None,
                )
                .unwrap(),
            )
        } else {
            None
        };

        let incentives_code_id = app.store_code(Box::new(
            ContractWrapper::new_with_empty(
                crate::contract::execute,
                crate::contract::instantiate,
                crate::contract::query,
            )
            .with_migrate(crate::contract::migrate),
        ));
        let incentives = app
            .instantiate_contract(
                incentives_code_id,
                owner.clone(),
                &InstantiateMsg {
                    owner: owner.to_string(),
                    lockup: lockup.to_string(),
                    epoch_driver: epoch_driver.to_string(),
                    hooks: hook_receiver.as_ref().map(|addr| vec![addr.to_string()]),
                },
                &[],
                "incentives",
                None,
            )
            .unwrap();

        Suite {
            app,
            incentives,
            lockup,
            hook_receiver,
            owner: owner.into_string(),
            epoch_driver: epoch_driver.into_string(),
        }
    }
}

pub struct Suite {
    pub app: App,
    pub incentives: Addr,
    pub lockup: Addr,
    pub hook_receiver: Option<Addr>,
    pub owner: String,
    pub epoch_driver: String,
}

impl Suite {
    pub fn advance_time(&mut self, seconds: u64) {
        self.app.update_block(|block| {
            block.time = block.time.plus_seconds(seconds);
            block.height += seconds / BLOCK_TIME;
        });
    }

    pub fn block_time(&self) -> Timestamp {
        self.app.block_info().time
    }

    pub fn mint(&mut self, recipient: impl Into<String>, amount: &[Coin]) {
        self.app
            .sudo(SudoMsg::Bank(BankSudo::Mint {
                to_address: recipient.into(),
                amount: amount.to_vec(),
            }))
            .unwrap();
    }

    pub fn balance(&self, address: impl Into<String>, denom: &str) -> u128 {
        self.app
            .wrap()
            .query_balance(address.into(), denom)
            .unwrap()
            .amount
            .u128()
    }

    pub fn set_locks(&mut self, locks: Vec<PeriodLock>) {
        self.app
            .execute_contract(
                Addr::unchecked(self.owner.clone()),
                self.lockup.clone(),
                &LockupExecuteMsg::SetLocks { locks },
                &[],
            )
            .unwrap();
    }

    /// Mints the funds to the owner and creates a gauge with them as budget
    pub fn create_gauge(&mut self, config: GaugeConfig, funds: &[Coin]) -> AnyResult<AppResponse> {
        if !funds.is_empty() {
            self.mint(self.owner.clone(), funds);
        }
        self.app.execute_contract(
            Addr::unchecked(self.owner.clone()),
            self.incentives.clone(),
            &ExecuteMsg::CreateGauge(config),
            funds,
        )
    }

    pub fn add_to_gauge(&mut self, gauge_id: GaugeId, funds: &[Coin]) -> AnyResult<AppResponse> {
        if !funds.is_empty() {
            self.mint(self.owner.clone(), funds);
        }
        self.app.execute_contract(
            Addr::unchecked(self.owner.clone()),
            self.incentives.clone(),
            &ExecuteMsg::AddToGauge { gauge_id },
            funds,
        )
    }

    pub fn distribute(&mut self) -> AnyResult<AppResponse> {
        self.distribute_as(self.epoch_driver.clone())
    }

    pub fn distribute_as(&mut self, sender: impl Into<String>) -> AnyResult<AppResponse> {
        self.app.execute_contract(
            Addr::unchecked(sender),
            self.incentives.clone(),
            &ExecuteMsg::Distribute {},
            &[],
        )
    }

    pub fn add_hook(
        &mut self,
        sender: impl Into<String>,
        addr: impl Into<String>,
    ) -> AnyResult<AppResponse> {
        self.app.execute_contract(
            Addr::unchecked(sender),
            self.incentives.clone(),
            &ExecuteMsg::AddHook { addr: addr.into() },
            &[],
        )
    }

    pub fn remove_hook(
        &mut self,
        sender: impl Into<String>,
        addr: impl Into<String>,
    ) -> AnyResult<AppResponse> {
        self.app.execute_contract(
            Addr::unchecked(sender),
            self.incentives.clone(),
            &ExecuteMsg::RemoveHook { addr: addr.into() },
            &[],
        )
    }

    pub fn query_gauge(&self, id: GaugeId) -> StdResult<GaugeResponse> {
        self.app
            .wrap()
            .query_wasm_smart(&self.incentives, &QueryMsg::Gauge { id })
    }

    pub fn query_gauges(&self, msg: &QueryMsg) -> StdResult<Vec<GaugeResponse>> {
        let response: ListGaugesResponse =
            self.app.wrap().query_wasm_smart(&self.incentives, msg)?;
        Ok(response.gauges)
    }

    pub fn query_upcoming_gauges(&self) -> StdResult<Vec<GaugeResponse>> {
        self.query_gauges(&QueryMsg::ListUpcomingGauges {
            start_after: None,
            limit: None,
        })
    }

    pub fn query_active_gauges(&self) -> StdResult<Vec<GaugeResponse>> {
        self.query_gauges(&QueryMsg::ListActiveGauges {
            start_after: None,
            limit: None,
        })
    }

    pub fn query_finished_gauges(&self) -> StdResult<Vec<GaugeResponse>> {
        self.query_gauges(&QueryMsg::ListFinishedGauges {
            start_after: None,
            limit: None,
        })
    }

    pub fn query_gauge_ids_by_denom(&self, denom: &str) -> StdResult<Vec<GaugeId>> {
        let response: GaugeIdsResponse = self.app.wrap().query_wasm_smart(
            &self.incentives,
            &QueryMsg::GaugeIdsByDenom {
                denom: denom.to_string(),
            },
        )?;
        Ok(response.ids)
    }

    pub fn query_to_distribute_coins(&self) -> StdResult<Vec<Coin>> {
        let response: CoinsResponse = self
            .app
            .wrap()
            .query_wasm_smart(&self.incentives, &QueryMsg::ToDistributeCoins {})?;
        Ok(response.coins)
    }

    pub fn query_distributed_coins(&self) -> StdResult<Vec<Coin>> {
        let response: CoinsResponse = self
            .app
            .wrap()
            .query_wasm_smart(&self.incentives, &QueryMsg::DistributedCoins {})?;
        Ok(response.coins)
    }

    pub fn query_distribution_estimate(
        &self,
        id: GaugeId,
    ) -> StdResult<DistributionEstimateResponse> {
        self.app
            .wrap()
            .query_wasm_smart(&self.incentives, &QueryMsg::DistributionEstimate { id })
    }

    pub fn query_hooks(&self) -> StdResult<Vec<String>> {
        let response: HooksResponse = self
            .app
            .wrap()
            .query_wasm_smart(&self.incentives, &QueryMsg::Hooks {})?;
        Ok(response.hooks)
    }

    pub fn query_hook_counts(&self) -> StdResult<CountsResponse> {
        self.app.wrap().query_wasm_smart(
            self.hook_receiver.as_ref().unwrap(),
            &hook_receiver::QueryMsg::Counts {},
        )
    }
}
