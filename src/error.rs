use cosmwasm_std::{CoinsError, StdError};
use cw_utils::PaymentError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error(transparent)]
    Std(#[from] StdError),

    #[error(transparent)]
    Ownership(#[from] cw_ownable::OwnershipError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("{0}")]
    Coins(#[from] CoinsError),

    #[error("Unauthorized")]
    Unauthorized {},

    #[error("Gauge with ID {0} does not exist")]
    GaugeMissing(u64),

    #[error("Gauge with ID {0} is not in the upcoming set")]
    GaugeNotUpcoming(u64),

    #[error("Gauge with ID {0} is not in the active set")]
    GaugeNotActive(u64),

    #[error("Gauge with ID {0} has already finished distributing")]
    GaugeFinished(u64),

    #[error("Gauge {gauge_id} is not able to start distribution yet: block time {block_time} < start time {start_time}")]
    DistributionNotStarted {
        gauge_id: u64,
        block_time: u64,
        start_time: u64,
    },

    #[error("Gauges selecting locks by lock end time cannot be distributed")]
    ByTimeCondition {},

    #[error("Non-perpetual gauge must be paid over at least one epoch")]
    ZeroEpochsPaidOver {},

    #[error("Gauge denom must not be empty")]
    EmptyDenom {},

    #[error("Sender should not be an empty address")]
    EmptySender {},

    #[error("Lock ID should be positive")]
    ZeroLockId {},

    #[error("Validator address should not be empty")]
    EmptyValidator {},

    #[error("Given address already registered as a hook")]
    HookAlreadyRegistered {},

    #[error("Given address not registered as a hook")]
    HookNotRegistered {},
}
