//! Business logic services.

#![allow(missing_docs)]

pub mod admission;
pub mod fees;
pub mod identity;
pub mod payment_review;
pub mod program;
pub mod registration;

pub use admission::{
    AdmissionContext, AdmissionPolicy, AdmissionPolicyRef, CapacityLimit, OpenAdmission,
    policy_from_config,
};
pub use fees::{FeeLine, PaymentSummary, derive_fee_lines};
pub use identity::{Claims, IdentityService, hash_password, verify_password};
pub use payment_review::{PaymentReview, PaymentReviewService};
pub use program::{CreateProgramInput, ProgramService, UpdateProgramInput};
pub use registration::{
    RegistrationForm, RegistrationInput, RegistrationOutcome, RegistrationService,
    RegistrationStatus,
};
