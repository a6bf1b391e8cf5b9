//! Trade settlement: one call coordinating compliance, forex, the payment
//! instrument and shipping.

pub mod orchestrator;
pub mod request;
pub mod result;
pub mod shipping;

pub use orchestrator::{determine_next_action, TradeSettlementSaga};
pub use request::{PaymentMethod, ShippingPriority, TradeRequest, TransactionType};
pub use result::{
    ComplianceSnapshot, ForexSnapshot, NextAction, PaymentSnapshot, PaymentStatus, SagaStep,
    SettlementFailure, SettlementStatus, ShipmentStatus, ShippingSnapshot, StepStatus,
    TimelineEntry, TradeSettlementResult,
};
pub use shipping::{
    Package, ShippingCollaborator, ShippingOrder, ShippingOrderRequest, SimulatedCarrier,
};
