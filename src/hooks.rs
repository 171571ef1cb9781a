//! Registry of observer contracts notified about distribution lifecycle
//! events. Observers are called in registration order through plain wasm
//! execute messages, so a failing observer aborts the whole epoch
//! transition.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{to_json_binary, Addr, CosmosMsg, StdResult, Storage, WasmMsg};
use cw_storage_plus::Item;

use crate::error::ContractError;
use crate::state::GaugeId;

// store all hook addresses in one item. We cannot have many of them before
// the contract becomes unusable anyway.
pub const HOOKS: Hooks = Hooks::new("hooks");

/// Lifecycle notifications delivered to registered observers
#[cw_serde]
pub enum IncentivesHookMsg {
    /// A non-perpetual gauge paid out its final epoch and moved to the
    /// finished set
    AfterFinishDistribution { gauge_id: GaugeId },
    /// An epoch distribution completed
    AfterEpochDistribution {},
}

/// Execute message shape observers must accept
#[cw_serde]
pub enum IncentivesHookExecuteMsg {
    IncentivesHook(IncentivesHookMsg),
}

#[cw_serde]
pub struct HooksResponse {
    pub hooks: Vec<String>,
}

pub struct Hooks<'a>(Item<'a, Vec<Addr>>);

impl<'a> Hooks<'a> {
    pub const fn new(storage_key: &'a str) -> Self {
        Hooks(Item::new(storage_key))
    }

    pub fn add_hook(&self, storage: &mut dyn Storage, addr: Addr) -> Result<(), ContractError> {
        let mut hooks = self.0.may_load(storage)?.unwrap_or_default();
        if hooks.iter().any(|h| h == &addr) {
            return Err(ContractError::HookAlreadyRegistered {});
        }
        hooks.push(addr);
        Ok(self.0.save(storage, &hooks)?)
    }

    pub fn remove_hook(&self, storage: &mut dyn Storage, addr: Addr) -> Result<(), ContractError> {
        let mut hooks = self.0.may_load(storage)?.unwrap_or_default();
        if let Some(p) = hooks.iter().position(|h| h == &addr) {
            hooks.remove(p);
        } else {
            return Err(ContractError::HookNotRegistered {});
        }
        Ok(self.0.save(storage, &hooks)?)
    }

    pub fn query_hooks(&self, storage: &dyn Storage) -> StdResult<HooksResponse> {
        let hooks = self
            .0
            .may_load(storage)?
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect();
        Ok(HooksResponse { hooks })
    }

    /// One execute message per registered observer, in registration order
    fn prepare_hooks(
        &self,
        storage: &dyn Storage,
        msg: IncentivesHookMsg,
    ) -> StdResult<Vec<CosmosMsg>> {
        let msg = to_json_binary(&IncentivesHookExecuteMsg::IncentivesHook(msg))?;
        Ok(self
            .0
            .may_load(storage)?
            .unwrap_or_default()
            .into_iter()
            .map(|contract_addr| {
                WasmMsg::Execute {
                    contract_addr: contract_addr.into_string(),
                    msg: msg.clone(),
                    funds: vec![],
                }
                .into()
            })
            .collect())
    }
}

/// Prepares AfterFinishDistribution messages for a gauge that just
/// completed its payout schedule
pub fn after_finish_distribution(
    storage: &dyn Storage,
    gauge_id: GaugeId,
) -> StdResult<Vec<CosmosMsg>> {
    HOOKS.prepare_hooks(
        storage,
        IncentivesHookMsg::AfterFinishDistribution { gauge_id },
    )
}

/// Prepares AfterEpochDistribution messages once an epoch's payouts are
/// complete
pub fn after_epoch_distribution(storage: &dyn Storage) -> StdResult<Vec<CosmosMsg>> {
    HOOKS.prepare_hooks(storage, IncentivesHookMsg::AfterEpochDistribution {})
}

#[cfg(test)]
mod tests {
    use cosmwasm_std::testing::mock_dependencies;

    use super::*;

    #[test]
    fn hooks_register_in_order_and_without_duplicates() {
        let mut deps = mock_dependencies();
        let storage = deps.as_mut().storage;

        HOOKS.add_hook(storage, Addr::unchecked("first")).unwrap();
        HOOKS.add_hook(storage, Addr::unchecked("second")).unwrap();
        let err = HOOKS.add_hook(storage, Addr::unchecked("first")).unwrap_err();
        assert_eq!(err, ContractError::HookAlreadyRegistered {});

        assert_eq!(
            HOOKS.query_hooks(storage).unwrap().hooks,
            vec!["first".to_string(), "second".to_string()]
        );

        let msgs = after_epoch_distribution(storage).unwrap();
        assert_eq!(msgs.len(), 2);

        HOOKS.remove_hook(storage, Addr::unchecked("first")).unwrap();
        let err = HOOKS
            .remove_hook(storage, Addr::unchecked("first"))
            .unwrap_err();
        assert_eq!(err, ContractError::HookNotRegistered {});
        assert_eq!(
            HOOKS.query_hooks(storage).unwrap().hooks,
            vec!["second".to_string()]
        );
    }

    #[test]
    fn finish_hook_carries_the_gauge_id() {
        let mut deps = mock_dependencies();
        let storage = deps.as_mut().storage;
        HOOKS.add_hook(storage, Addr::unchecked("observer")).unwrap();

        let msgs = after_finish_distribution(storage, 42).unwrap();
        match &msgs[0] {
            CosmosMsg::Wasm(WasmMsg::Execute { contract_addr, msg, .. }) => {
                assert_eq!(contract_addr, "observer");
                let decoded: IncentivesHookExecuteMsg = cosmwasm_std::from_json(msg).unwrap();
                assert_eq!(
                    decoded,
                    IncentivesHookExecuteMsg::IncentivesHook(
                        IncentivesHookMsg::AfterFinishDistribution { gauge_id: 42 }
                    )
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
