//! Letters of credit: issuance, drawing and document presentation.

pub mod instrument;
pub mod service;
pub mod state;

pub use instrument::{
    CreateLcRequest, LcType, LetterOfCredit, PaymentTerms, Presentation, PresentationStatus,
    PresentedDocument, Utilization,
};
pub use service::{LcAnalytics, LetterOfCreditService};
pub use state::LcStatus;
