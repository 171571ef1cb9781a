use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, Timestamp};
use cw_ownable::{cw_ownable_execute, cw_ownable_query};

use crate::error::ContractError;
use crate::hooks::HooksResponse;
use crate::lockup::QueryCondition;
use crate::state::{Config, GaugeId};

#[cw_serde]
pub struct InstantiateMsg {
    /// Address that can register hooks and update the configuration
    pub owner: String,
    /// Lockup contract owning the period locks gauges pay out to
    pub lockup: String,
    /// Address allowed to trigger the per-epoch distribution, typically an
    /// epochs/cron contract
    pub epoch_driver: String,
    /// Observers to register before the first epoch runs
    pub hooks: Option<Vec<String>>,
}

#[cw_serde]
pub struct GaugeConfig {
    /// A perpetual gauge pays its entire remaining balance every epoch;
    /// a non-perpetual one splits its budget over `num_epochs_paid_over`
    pub is_perpetual: bool,
    /// Which locks the gauge pays out to. Only duration conditions can be
    /// distributed.
    pub distribute_to: QueryCondition,
    /// Earliest epoch at which distribution may begin; defaults to the
    /// current block time
    pub start_time: Option<Timestamp>,
    /// Number of epochs the budget is spread over; ignored for perpetual
    /// gauges
    pub num_epochs_paid_over: u64,
}

#[cw_ownable_execute]
#[cw_serde]
pub enum ExecuteMsg {
    /// Creates a new gauge. The funds sent along become the gauge's budget.
    CreateGauge(GaugeConfig),
    /// Tops up the budget of a not-yet-finished gauge with the sent funds
    AddToGauge { gauge_id: GaugeId },
    /// Runs one epoch: activates due gauges, pays out every active gauge to
    /// its qualifying lock holders, and retires fully paid out gauges.
    /// Only the configured epoch driver may call this.
    Distribute {},
    /// Registers an observer notified about distribution events.
    /// Can only be called by owner.
    AddHook { addr: String },
    /// Removes a registered observer. Can only be called by owner.
    RemoveHook { addr: String },
}

#[cw_ownable_query]
#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Contract configuration
    #[returns(Config)]
    Config {},
    /// Returns details for a specific gauge
    #[returns(GaugeResponse)]
    Gauge { id: GaugeId },
    /// List all gauges regardless of lifecycle, ordered by id
    #[returns(ListGaugesResponse)]
    ListGauges {
        start_after: Option<GaugeId>,
        limit: Option<u32>,
    },
    /// Gauges waiting for their start time, ordered by start time then id.
    /// `start_after` is the `(start_time_ns, id)` pair of the last entry.
    #[returns(ListGaugesResponse)]
    ListUpcomingGauges {
        start_after: Option<(u64, GaugeId)>,
        limit: Option<u32>,
    },
    /// Gauges currently distributing, ordered by start time then id
    #[returns(ListGaugesResponse)]
    ListActiveGauges {
        start_after: Option<(u64, GaugeId)>,
        limit: Option<u32>,
    },
    /// Gauges that finished their payout schedule, ordered by start time
    /// then id
    #[returns(ListGaugesResponse)]
    ListFinishedGauges {
        start_after: Option<(u64, GaugeId)>,
        limit: Option<u32>,
    },
    /// Ids of not-yet-finished gauges paying out to the given denom
    #[returns(GaugeIdsResponse)]
    GaugeIdsByDenom { denom: String },
    /// Sum of coins still owed by upcoming and active gauges
    #[returns(CoinsResponse)]
    ToDistributeCoins {},
    /// Sum of coins paid out so far by active and finished gauges
    #[returns(CoinsResponse)]
    DistributedCoins {},
    /// Previews the next epoch's payout of a gauge without changing state
    #[returns(DistributionEstimateResponse)]
    DistributionEstimate { id: GaugeId },
    /// Registered observers, in registration order
    #[returns(HooksResponse)]
    Hooks {},
}

/// Information about one gauge
#[cw_serde]
pub struct GaugeResponse {
    pub id: GaugeId,
    pub is_perpetual: bool,
    pub distribute_to: QueryCondition,
    pub coins: Vec<Coin>,
    pub start_time: Timestamp,
    pub num_epochs_paid_over: u64,
    pub filled_epochs: u64,
    pub distributed_coins: Vec<Coin>,
}

#[cw_serde]
pub struct ListGaugesResponse {
    pub gauges: Vec<GaugeResponse>,
}

#[cw_serde]
pub struct GaugeIdsResponse {
    pub ids: Vec<GaugeId>,
}

#[cw_serde]
pub struct CoinsResponse {
    pub coins: Vec<Coin>,
}

#[cw_serde]
pub struct DistributionEstimateResponse {
    /// The gauge as it would look after the next epoch
    pub gauge: GaugeResponse,
    /// Coins the next epoch would pay out to the qualifying locks
    pub coins: Vec<Coin>,
}

#[cw_serde]
pub struct MigrateMsg {}

/// Messages accepted at the superfluid staking boundary. They are routed
/// and executed by the superfluid module; only field validation lives here.
#[cw_serde]
pub struct SuperfluidDelegateMsg {
    pub sender: String,
    pub lock_id: u64,
    pub val_addr: String,
}

impl SuperfluidDelegateMsg {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.sender.is_empty() {
            return Err(ContractError::EmptySender {});
        }
        if self.lock_id == 0 {
            return Err(ContractError::ZeroLockId {});
        }
        if self.val_addr.is_empty() {
            return Err(ContractError::EmptyValidator {});
        }
        Ok(())
    }
}

#[cw_serde]
pub struct SuperfluidUndelegateMsg {
    pub sender: String,
    pub lock_id: u64,
}

impl SuperfluidUndelegateMsg {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.sender.is_empty() {
            return Err(ContractError::EmptySender {});
        }
        if self.lock_id == 0 {
            return Err(ContractError::ZeroLockId {});
        }
        Ok(())
    }
}

#[cw_serde]
pub struct SuperfluidRedelegateMsg {
    pub sender: String,
    pub lock_id: u64,
    pub new_val_addr: String,
}

impl SuperfluidRedelegateMsg {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.sender.is_empty() {
            return Err(ContractError::EmptySender {});
        }
        if self.lock_id == 0 {
            return Err(ContractError::ZeroLockId {});
        }
        if self.new_val_addr.is_empty() {
            return Err(ContractError::EmptyValidator {});
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superfluid_delegate_validation() {
        let valid = SuperfluidDelegateMsg {
            sender: "sender".to_string(),
            lock_id: 1,
            val_addr: "valoper".to_string(),
        };
        valid.validate().unwrap();

        let mut msg = valid.clone();
        msg.sender = String::new();
        assert_eq!(msg.validate().unwrap_err(), ContractError::EmptySender {});

        let mut msg = valid.clone();
        msg.lock_id = 0;
        assert_eq!(msg.validate().unwrap_err(), ContractError::ZeroLockId {});

        let mut msg = valid;
        msg.val_addr = String::new();
        assert_eq!(msg.validate().unwrap_err(), ContractError::EmptyValidator {});
    }

    #[test]
    fn superfluid_undelegate_validation() {
        let valid = SuperfluidUndelegateMsg {
            sender: "sender".to_string(),
            lock_id: 1,
        };
        valid.validate().unwrap();

        let mut msg = valid.clone();
        msg.sender = String::new();
        assert_eq!(msg.validate().unwrap_err(), ContractError::EmptySender {});

        let mut msg = valid;
        msg.lock_id = 0;
        assert_eq!(msg.validate().unwrap_err(), ContractError::ZeroLockId {});
    }

    #[test]
    fn superfluid_redelegate_validation() {
        let valid = SuperfluidRedelegateMsg {
            sender: "sender".to_string(),
            lock_id: 1,
            new_val_addr: "valoper".to_string(),
        };
        valid.validate().unwrap();

        let mut msg = valid.clone();
        msg.new_val_addr = String::new();
        assert_eq!(msg.validate().unwrap_err(), ContractError::EmptyValidator {});

        let mut msg = valid;
        msg.lock_id = 0;
        assert_eq!(msg.validate().unwrap_err(), ContractError::ZeroLockId {});
    }
}
