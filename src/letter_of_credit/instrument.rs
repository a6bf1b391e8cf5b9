use crate::core::currency::CurrencyCode;
use crate::core::party::PartyId;
use crate::letter_of_credit::state::LcStatus;
use crate::store::Entity;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LcType {
    #[default]
    Commercial,
    Standby,
    Revolving,
    Transferable,
    BackToBack,
}

impl fmt::Display for LcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Commercial => "commercial",
            Self::Standby => "standby",
            Self::Revolving => "revolving",
            Self::Transferable => "transferable",
            Self::BackToBack => "back_to_back",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    #[default]
    AtSight,
    DeferredPayment,
    Acceptance,
    Negotiation,
    Mixed,
}

/// A draw against the credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub amount: Decimal,
    pub utilized_at: DateTime<Utc>,
    pub details: Option<String>,
    pub utilized_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentedDocument {
    pub document_type: String,
    pub document_name: String,
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStatus {
    #[default]
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub documents: Vec<PresentedDocument>,
    pub presented_by: String,
    pub presented_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: PresentationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLcRequest {
    pub lc_number: String,
    #[serde(default)]
    pub lc_type: LcType,
    pub applicant: PartyId,
    pub applicant_name: String,
    pub beneficiary: PartyId,
    pub beneficiary_name: String,
    pub issuing_bank: PartyId,
    pub issuing_bank_name: String,
    pub advising_bank: Option<PartyId>,
    pub advising_bank_name: Option<String>,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub expiry_date: DateTime<Utc>,
    pub latest_shipment_date: DateTime<Utc>,
    #[serde(default)]
    pub payment_terms: PaymentTerms,
    pub shipment_terms: String,
    pub documents_required: Vec<String>,
    pub goods_description: String,
    pub port_of_loading: Option<String>,
    pub port_of_discharge: Option<String>,
    #[serde(default)]
    pub partial_shipments: bool,
    #[serde(default)]
    pub transshipment: bool,
}

/// A bank payment guarantee, drawn against by document presentation.
///
/// `amount == utilized_amount + remaining_amount` holds after every
/// operation; the only way to move money between the two is
/// [`LetterOfCredit::draw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterOfCredit {
    pub id: Uuid,
    pub lc_number: String,
    pub lc_type: LcType,
    pub status: LcStatus,
    pub applicant: PartyId,
    pub applicant_name: String,
    pub beneficiary: PartyId,
    pub beneficiary_name: String,
    pub issuing_bank: PartyId,
    pub issuing_bank_name: String,
    pub advising_bank: Option<PartyId>,
    pub advising_bank_name: Option<String>,
    pub amount: Decimal,
    pub utilized_amount: Decimal,
    pub remaining_amount: Decimal,
    pub currency: CurrencyCode,
    pub expiry_date: DateTime<Utc>,
    pub latest_shipment_date: DateTime<Utc>,
    pub payment_terms: PaymentTerms,
    pub shipment_terms: String,
    pub documents_required: Vec<String>,
    pub goods_description: String,
    pub port_of_loading: Option<String>,
    pub port_of_discharge: Option<String>,
    pub partial_shipments: bool,
    pub transshipment: bool,
    pub utilizations: Vec<Utilization>,
    pub presentations: Vec<Presentation>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issued_by: Option<String>,
    pub bank_reference: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub activated_by: Option<String>,
    pub expired_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub closure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub version: u64,
}

impl LetterOfCredit {
    pub fn new(request: CreateLcRequest, created_by: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lc_number: request.lc_number,
            lc_type: request.lc_type,
            status: LcStatus::Draft,
            applicant: request.applicant,
            applicant_name: request.applicant_name,
            beneficiary: request.beneficiary,
            beneficiary_name: request.beneficiary_name,
            issuing_bank: request.issuing_bank,
            issuing_bank_name: request.issuing_bank_name,
            advising_bank: request.advising_bank,
            advising_bank_name: request.advising_bank_name,
            amount: request.amount,
            utilized_amount: Decimal::ZERO,
            remaining_amount: request.amount,
            currency: request.currency,
            expiry_date: request.expiry_date,
            latest_shipment_date: request.latest_shipment_date,
            payment_terms: request.payment_terms,
            shipment_terms: request.shipment_terms,
            documents_required: request.documents_required,
            goods_description: request.goods_description,
            port_of_loading: request.port_of_loading,
            port_of_discharge: request.port_of_discharge,
            partial_shipments: request.partial_shipments,
            transshipment: request.transshipment,
            utilizations: Vec::new(),
            presentations: Vec::new(),
            issued_at: None,
            issued_by: None,
            bank_reference: None,
            activated_at: None,
            activated_by: None,
            expired_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            closed_at: None,
            closed_by: None,
            closure_reason: None,
            created_at: now,
            created_by: created_by.to_string(),
            version: 0,
        }
    }

    /// Move `amount` from remaining to utilized and record the draw.
    ///
    /// Callers check `amount <= remaining_amount` first. Returns whether the
    /// credit is now fully drawn.
    pub fn draw(&mut self, utilization: Utilization) -> bool {
        self.utilized_amount += utilization.amount;
        self.remaining_amount = self.amount - self.utilized_amount;
        self.utilizations.push(utilization);
        self.remaining_amount.is_zero()
    }

    /// Required document types absent from `presented`, in required order.
    pub fn missing_documents(&self, presented: &[PresentedDocument]) -> Vec<String> {
        self.documents_required
            .iter()
            .filter(|required| !presented.iter().any(|d| &d.document_type == *required))
            .cloned()
            .collect()
    }

    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }
}

impl Entity for LetterOfCredit {
    const KIND: &'static str = "letter of credit";

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn status_label(&self) -> String {
        self.status.as_str().to_string()
    }

    fn parties(&self) -> Vec<PartyId> {
        let mut parties = vec![
            self.applicant.clone(),
            self.beneficiary.clone(),
            self.issuing_bank.clone(),
        ];
        parties.extend(self.advising_bank.clone());
        parties
    }

    fn lookup_key(&self) -> Option<String> {
        Some(self.lc_number.clone())
    }
}
