//! The trade settlement saga.
//!
//! `settle` runs compliance → forex → payment → shipping strictly in order
//! and always returns a [`TradeSettlementResult`]. A failing step ends the
//! run with status `Failed`, the timeline up to that step, a
//! [`SettlementFailure`] naming it, and `ContactSupport` as the next action.
//! Escrows and letters of credit created before the failure are cancelled
//! first, so a failed run leaves no live payment instrument behind.

use crate::compliance::{
    CheckRequest, ComplianceCheck, ComplianceEngine, ComplianceStatus, Counterparty, EntityType,
    Priority, RiskLevel, SubjectData,
};
use crate::config::SettlementConfig;
use crate::core::clock::{self, Clock};
use crate::core::error::SettlementError;
use crate::escrow::{CreateEscrowRequest, EscrowCategory, EscrowService, EscrowTransaction};
use crate::forex::{ConversionRequest, ForexRate, ForexRateManager};
use crate::letter_of_credit::{
    CreateLcRequest, LcType, LetterOfCredit, LetterOfCreditService, PaymentTerms,
};
use crate::saga::request::{PaymentMethod, ShippingPriority, TradeRequest};
use crate::saga::result::{
    ComplianceSnapshot, ForexSnapshot, NextAction, PaymentSnapshot, PaymentStatus, SagaStep,
    SettlementFailure, SettlementStatus, ShipmentStatus, ShippingSnapshot, StepStatus,
    TimelineEntry, TradeSettlementResult,
};
use crate::saga::shipping::{Package, ShippingCollaborator, ShippingOrderRequest};
use crate::store::InMemoryRepository;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

/// Coordinates the settlement services for one trade at a time.
#[derive(Debug, Clone)]
pub struct TradeSettlementSaga {
    compliance: ComplianceEngine,
    forex: ForexRateManager,
    escrow: EscrowService,
    letters_of_credit: LetterOfCreditService,
    shipping: Arc<dyn ShippingCollaborator>,
    clock: Arc<dyn Clock>,
    config: SettlementConfig,
}

/// State accumulated while a run is in flight.
struct SagaRun {
    transaction_id: String,
    method: PaymentMethod,
    timeline: Vec<TimelineEntry>,
    compliance: Option<ComplianceSnapshot>,
    forex: Option<ForexSnapshot>,
    escrow_id: Option<Uuid>,
    lc_id: Option<Uuid>,
    reference: Option<String>,
}

impl SagaRun {
    fn record(&mut self, step: SagaStep, status: StepStatus, at: DateTime<Utc>, notes: String) {
        self.timeline.push(TimelineEntry {
            step,
            status,
            timestamp: at,
            notes: Some(notes),
        });
    }
}

impl TradeSettlementSaga {
    pub fn new(
        compliance: ComplianceEngine,
        forex: ForexRateManager,
        escrow: EscrowService,
        letters_of_credit: LetterOfCreditService,
        shipping: Arc<dyn ShippingCollaborator>,
        clock: Arc<dyn Clock>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            compliance,
            forex,
            escrow,
            letters_of_credit,
            shipping,
            clock,
            config,
        }
    }

    /// Wire every service to its own in-memory store.
    pub fn in_memory(
        config: SettlementConfig,
        clock: Arc<dyn Clock>,
        shipping: Arc<dyn ShippingCollaborator>,
    ) -> Self {
        let compliance = ComplianceEngine::new(
            Arc::new(InMemoryRepository::<ComplianceCheck>::new()),
            clock.clone(),
            config.compliance.clone(),
        );
        let forex = ForexRateManager::new(
            Arc::new(InMemoryRepository::<ForexRate>::new()),
            clock.clone(),
            config.forex.clone(),
        );
        let escrow = EscrowService::new(
            Arc::new(InMemoryRepository::<EscrowTransaction>::new()),
            clock.clone(),
        );
        let letters_of_credit = LetterOfCreditService::new(
            Arc::new(InMemoryRepository::<LetterOfCredit>::new()),
            clock.clone(),
        );
        Self::new(
            compliance,
            forex,
            escrow,
            letters_of_credit,
            shipping,
            clock,
            config,
        )
    }

    pub fn compliance(&self) -> &ComplianceEngine {
        &self.compliance
    }

    pub fn forex(&self) -> &ForexRateManager {
        &self.forex
    }

    pub fn escrow(&self) -> &EscrowService {
        &self.escrow
    }

    pub fn letters_of_credit(&self) -> &LetterOfCreditService {
        &self.letters_of_credit
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Settle one trade. Never returns an error; failures are reported in
    /// the result.
    pub fn settle(&self, request: &TradeRequest) -> TradeSettlementResult {
        let now = self.clock.now();
        let mut run = SagaRun {
            transaction_id: generate_transaction_id(now),
            method: request.payment_method,
            timeline: Vec::new(),
            compliance: None,
            forex: None,
            escrow_id: None,
            lc_id: None,
            reference: None,
        };
        info!(
            "settling {} {}: {} {} {} -> {} via {}",
            run.transaction_id,
            request.transaction_type,
            request.amount,
            request.currency,
            request.seller_country,
            request.buyer_country,
            request.payment_method
        );
        run.record(
            SagaStep::TradeInitiated,
            StepStatus::Completed,
            now,
            format!("Cross-border trade {} initiated", request.transaction_type),
        );

        if let Err(e) = request.validate() {
            return self.fail(run, SagaStep::RequestValidation, e.kind(), e.to_string());
        }

        // 1. compliance
        let compliance = match self.screen(request, &run.transaction_id) {
            Ok(snapshot) => snapshot,
            Err(e) => return self.fail(run, SagaStep::ComplianceCheck, e.kind(), e.to_string()),
        };
        let step_status = match compliance.status {
            ComplianceStatus::Approved => StepStatus::Approved,
            ComplianceStatus::Rejected => StepStatus::Rejected,
            _ => StepStatus::Pending,
        };
        run.record(
            SagaStep::ComplianceCheck,
            step_status,
            self.clock.now(),
            format!(
                "Compliance check {} ({} checks, risk {})",
                compliance.status,
                compliance.check_ids.len(),
                compliance.risk_level
            ),
        );
        let rejected = compliance.status == ComplianceStatus::Rejected;
        let message = if compliance.restrictions.is_empty() {
            "compliance check rejected".to_string()
        } else {
            format!("compliance check rejected: {}", compliance.restrictions.join("; "))
        };
        run.compliance = Some(compliance);
        if rejected {
            return self.fail(run, SagaStep::ComplianceCheck, "compliance_rejected", message);
        }

        // 2. forex, 5. cost
        let converted = self
            .convert(request)
            .and_then(|forex| Ok((self.total_cost(request, &forex)?, forex)));
        let (total_cost, forex) = match converted {
            Ok(costed) => costed,
            Err(e) => return self.fail(run, SagaStep::ForexConversion, e.kind(), e.to_string()),
        };
        let notes = match forex.locked_rate {
            Some(rate) => format!("FX rate locked at {}", rate),
            None => format!("FX rate {} (no conversion needed)", forex.exchange_rate),
        };
        run.record(SagaStep::ForexConversion, StepStatus::Completed, self.clock.now(), notes);
        run.forex = Some(forex.clone());

        // 3. payment
        let payment = match self.setup_payment(request, &mut run) {
            Ok(snapshot) => snapshot,
            Err(e) => return self.fail(run, SagaStep::PaymentSetup, e.kind(), e.to_string()),
        };
        run.record(
            SagaStep::PaymentSetup,
            StepStatus::Pending,
            self.clock.now(),
            format!("Payment method {} set up", request.payment_method),
        );

        // 4. shipping
        let shipping = if request.shipping_required {
            match self.arrange_shipping(request, &run.transaction_id) {
                Ok(snapshot) => {
                    run.record(
                        SagaStep::ShippingSetup,
                        StepStatus::Pending,
                        self.clock.now(),
                        format!("Shipping arranged, tracking {}", snapshot.tracking_number),
                    );
                    Some(snapshot)
                }
                Err(e) => {
                    return self.fail(run, SagaStep::ShippingSetup, e.kind(), e.to_string())
                }
            }
        } else {
            None
        };

        // 6. next action
        let compliance = run.compliance.take();
        let compliance_status = compliance
            .as_ref()
            .map_or(ComplianceStatus::Pending, |c| c.status);
        let (next_action, next_action_due) = determine_next_action(
            compliance_status,
            &payment,
            shipping.as_ref(),
            self.clock.now(),
            &self.config,
        );
        let status = if compliance_status == ComplianceStatus::Approved {
            SettlementStatus::ComplianceApproved
        } else {
            SettlementStatus::PendingCompliance
        };

        info!(
            "settled {}: {:?}, total {} {}, next {:?}",
            run.transaction_id, status, total_cost, forex.settlement_currency, next_action
        );
        TradeSettlementResult {
            transaction_id: run.transaction_id,
            status,
            forex: Some(forex),
            payment,
            estimated_delivery: shipping.as_ref().map(|s| s.estimated_delivery),
            shipping,
            compliance,
            timeline: run.timeline,
            total_cost,
            next_action,
            next_action_due,
            failure: None,
        }
    }

    /// Run the configured screening battery. Stops at the first rejection.
    fn screen(
        &self,
        request: &TradeRequest,
        transaction_id: &str,
    ) -> Result<ComplianceSnapshot, SettlementError> {
        let subject = SubjectData {
            name: Some(format!("{}_{}", request.transaction_type, transaction_id)),
            tax_id: request.buyer_tax_id.clone(),
            country: Some(request.buyer_country.clone()),
            transaction_amount: Some(request.amount),
            currency: Some(request.currency.clone()),
            counterparties: vec![Counterparty {
                name: request.seller.to_string(),
                country: request.seller_country.clone(),
                registration_number: None,
            }],
            goods_description: Some(request.goods_description.clone()),
            hs_code: request.hs_code.clone(),
            origin_country: Some(request.seller_country.clone()),
            destination_country: Some(request.buyer_country.clone()),
            ..Default::default()
        };
        let priority = if request.priority == ShippingPriority::Urgent {
            Priority::High
        } else {
            Priority::Medium
        };
        let due_date =
            clock::after_hours(self.clock.now(), self.config.saga.compliance_due_hours)?;

        let mut snapshot = ComplianceSnapshot {
            status: ComplianceStatus::Approved,
            risk_level: RiskLevel::Low,
            restrictions: Vec::new(),
            conditions: Vec::new(),
            check_ids: Vec::new(),
        };
        for category in &self.config.saga.screening {
            let check = self.compliance.run_compliance_check(CheckRequest {
                entity_type: EntityType::Transaction,
                entity_id: transaction_id.to_string(),
                category: *category,
                subject: subject.clone(),
                priority,
                requested_by: self.config.saga.operator.clone(),
                due_date: Some(due_date),
            })?;

            snapshot.check_ids.push(check.id);
            snapshot.risk_level = snapshot.risk_level.max(check.risk_level);
            snapshot
                .restrictions
                .extend(check.restrictions.iter().map(|r| r.description.clone()));
            snapshot.conditions.extend(check.conditions.iter().cloned());
            match check.status {
                ComplianceStatus::Approved => {}
                ComplianceStatus::Rejected => {
                    snapshot.status = ComplianceStatus::Rejected;
                    break;
                }
                _ => snapshot.status = ComplianceStatus::Pending,
            }
        }
        Ok(snapshot)
    }

    fn convert(&self, request: &TradeRequest) -> Result<ForexSnapshot, SettlementError> {
        let settlement_currency = self.config.saga.settlement_currency.clone();
        let conversion = self.forex.convert(
            &ConversionRequest::new(
                request.currency.clone(),
                settlement_currency.clone(),
                request.amount,
            )
            .locked_for(self.config.saga.rate_lock_minutes),
        )?;
        Ok(ForexSnapshot {
            exchange_rate: conversion.rate,
            converted_amount: conversion.converted_amount,
            settlement_currency,
            locked_rate: conversion.locked_rate,
            lock_expiry: conversion.locked_until,
        })
    }

    fn setup_payment(
        &self,
        request: &TradeRequest,
        run: &mut SagaRun,
    ) -> Result<PaymentSnapshot, SettlementError> {
        let operator = &self.config.saga.operator;
        match request.payment_method {
            PaymentMethod::Escrow => {
                let escrow = self.escrow.create(
                    CreateEscrowRequest {
                        transaction_ref: run.transaction_id.clone(),
                        category: EscrowCategory::TradePayment,
                        amount: request.amount,
                        currency: request.currency.clone(),
                        buyer: request.buyer.clone(),
                        seller: request.seller.clone(),
                        release_conditions: self.config.saga.escrow_release_conditions.clone(),
                    },
                    operator,
                )?;
                run.escrow_id = Some(escrow.id);
                run.reference = Some(escrow.id.to_string());
                Ok(PaymentSnapshot {
                    method: PaymentMethod::Escrow,
                    status: PaymentStatus::Pending,
                    reference: run.reference.clone(),
                    escrow_id: Some(escrow.id),
                    lc_id: None,
                })
            }
            PaymentMethod::LetterOfCredit => {
                let defaults = &self.config.letter_of_credit;
                let now = self.clock.now();
                let expiry_date = clock::after_days(now, defaults.expiry_days)?;
                let latest_shipment_date = clock::after_days(now, defaults.latest_shipment_days)?;
                let lc = self.letters_of_credit.create(
                    CreateLcRequest {
                        lc_number: format!("LC-{}", run.transaction_id),
                        lc_type: LcType::Commercial,
                        applicant: request.buyer.clone(),
                        applicant_name: format!("Buyer {}", request.buyer),
                        beneficiary: request.seller.clone(),
                        beneficiary_name: format!("Seller {}", request.seller),
                        issuing_bank: defaults.issuing_bank_id.as_str().into(),
                        issuing_bank_name: defaults.issuing_bank_name.clone(),
                        advising_bank: None,
                        advising_bank_name: None,
                        amount: request.amount,
                        currency: request.currency.clone(),
                        expiry_date,
                        latest_shipment_date,
                        payment_terms: PaymentTerms::AtSight,
                        shipment_terms: defaults.shipment_terms.clone(),
                        documents_required: defaults.documents_required.clone(),
                        goods_description: request.goods_description.clone(),
                        port_of_loading: Some("Origin Port".to_string()),
                        port_of_discharge: Some("Destination Port".to_string()),
                        partial_shipments: false,
                        transshipment: false,
                    },
                    operator,
                )?;
                run.lc_id = Some(lc.id);
                run.reference = Some(lc.lc_number.clone());
                self.letters_of_credit.request_issuance(lc.id, operator)?;
                Ok(PaymentSnapshot {
                    method: PaymentMethod::LetterOfCredit,
                    status: PaymentStatus::Requested,
                    reference: run.reference.clone(),
                    escrow_id: None,
                    lc_id: Some(lc.id),
                })
            }
            PaymentMethod::TelegraphicTransfer => {
                run.reference = Some(format!("TT-{}", run.transaction_id));
                Ok(PaymentSnapshot {
                    method: PaymentMethod::TelegraphicTransfer,
                    status: PaymentStatus::Pending,
                    reference: run.reference.clone(),
                    escrow_id: None,
                    lc_id: None,
                })
            }
        }
    }

    fn arrange_shipping(
        &self,
        request: &TradeRequest,
        transaction_id: &str,
    ) -> Result<ShippingSnapshot, SettlementError> {
        let order = self.shipping.create_order(&ShippingOrderRequest {
            order_ref: transaction_id.to_string(),
            origin: request.seller_country.clone(),
            destination: request.buyer_country.clone(),
            packages: vec![Package {
                weight_kg: dec!(100),
                description: request.goods_description.clone(),
                value: request.amount,
            }],
            priority: request.priority,
            insurance_value: request.amount,
            special_instructions: request.special_instructions.clone(),
        })?;
        Ok(ShippingSnapshot {
            shipping_id: order.id,
            tracking_number: order.tracking_number,
            estimated_delivery: order.estimated_delivery,
            status: ShipmentStatus::Pending,
        })
    }

    /// Converted amount plus the instrument fee and, when shipping is
    /// requested, the flat shipping estimate.
    fn total_cost(
        &self,
        request: &TradeRequest,
        forex: &ForexSnapshot,
    ) -> Result<Decimal, SettlementError> {
        let fees = &self.config.fees;
        let converted = forex.converted_amount;
        let instrument_fee = match request.payment_method {
            PaymentMethod::Escrow => converted.checked_mul(fees.escrow_rate),
            PaymentMethod::LetterOfCredit => Some(fees.letter_of_credit_flat),
            PaymentMethod::TelegraphicTransfer => Some(Decimal::ZERO),
        };
        let shipping = if request.shipping_required {
            fees.shipping_estimate
        } else {
            Decimal::ZERO
        };
        instrument_fee
            .and_then(|fee| converted.checked_add(fee))
            .and_then(|cost| cost.checked_add(shipping))
            .ok_or_else(|| SettlementError::validation("amount out of range"))
    }

    /// Cancel whatever payment instrument the run created. Returns whether
    /// one was rolled back.
    fn compensate(&self, run: &mut SagaRun) -> bool {
        let reason = format!("settlement {} failed", run.transaction_id);
        let operator = self.config.saga.operator.clone();
        let mut rolled_back = false;

        if let Some(id) = run.escrow_id {
            let outcome = self.escrow.cancel(id, &reason).map(|_| ());
            rolled_back |= self.record_compensation(run, "escrow", id, outcome);
        }
        if let Some(id) = run.lc_id {
            let outcome = self
                .letters_of_credit
                .cancel(id, &reason, &operator)
                .map(|_| ());
            rolled_back |= self.record_compensation(run, "letter of credit", id, outcome);
        }
        rolled_back
    }

    fn record_compensation(
        &self,
        run: &mut SagaRun,
        instrument: &str,
        id: Uuid,
        outcome: Result<(), SettlementError>,
    ) -> bool {
        let now = self.clock.now();
        match outcome {
            Ok(()) => {
                warn!("{}: cancelled {} {}", run.transaction_id, instrument, id);
                run.record(
                    SagaStep::Compensation,
                    StepStatus::Completed,
                    now,
                    format!("Cancelled {} {}", instrument, id),
                );
                true
            }
            Err(e) => {
                error!(
                    "{}: could not cancel {} {}: {}",
                    run.transaction_id, instrument, id, e
                );
                run.record(
                    SagaStep::Compensation,
                    StepStatus::Failed,
                    now,
                    format!("Could not cancel {} {}: {}", instrument, id, e),
                );
                false
            }
        }
    }

    fn fail(
        &self,
        mut run: SagaRun,
        step: SagaStep,
        kind: &str,
        message: String,
    ) -> TradeSettlementResult {
        warn!("settlement {} failed at {:?}: {}", run.transaction_id, step, message);
        let compensated = self.compensate(&mut run);
        run.record(
            SagaStep::TradeFailed,
            StepStatus::Failed,
            self.clock.now(),
            message.clone(),
        );

        TradeSettlementResult {
            transaction_id: run.transaction_id,
            status: SettlementStatus::Failed,
            forex: run.forex,
            payment: PaymentSnapshot {
                method: run.method,
                status: if compensated {
                    PaymentStatus::Cancelled
                } else {
                    PaymentStatus::Failed
                },
                reference: run.reference,
                escrow_id: run.escrow_id,
                lc_id: run.lc_id,
            },
            shipping: None,
            compliance: run.compliance,
            timeline: run.timeline,
            total_cost: Decimal::ZERO,
            estimated_delivery: None,
            next_action: NextAction::ContactSupport,
            next_action_due: None,
            failure: Some(SettlementFailure {
                step,
                kind: kind.to_string(),
                message,
            }),
        }
    }
}

/// Pick the next action by priority: compliance, then payment, then shipping.
pub fn determine_next_action(
    compliance: ComplianceStatus,
    payment: &PaymentSnapshot,
    shipping: Option<&ShippingSnapshot>,
    now: DateTime<Utc>,
    config: &SettlementConfig,
) -> (NextAction, Option<DateTime<Utc>>) {
    if compliance != ComplianceStatus::Approved {
        return (
            NextAction::AwaitComplianceApproval,
            clock::after_hours(now, config.saga.compliance_due_hours).ok(),
        );
    }
    if payment.status.is_pending() {
        let action = match payment.method {
            PaymentMethod::Escrow => NextAction::FundEscrow,
            PaymentMethod::LetterOfCredit => NextAction::AwaitLcIssuance,
            PaymentMethod::TelegraphicTransfer => NextAction::InitiatePayment,
        };
        return (action, clock::after_hours(now, config.saga.payment_due_hours).ok());
    }
    if shipping.is_some_and(|s| s.status == ShipmentStatus::Pending) {
        return (NextAction::SchedulePickup, None);
    }
    (NextAction::MonitorDelivery, None)
}

fn generate_transaction_id(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("CBT-{}-{:04}", now.timestamp_millis(), suffix)
}
