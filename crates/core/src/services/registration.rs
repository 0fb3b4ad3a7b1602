//! Registration workflow.
//!
//! A registration creates the applicant's account, their student profile, a
//! pending enrollment in the chosen program and one pending payment per
//! positive fee component. All rows are written in a single transaction.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use markaz_common::{AppError, AppResult, IdGenerator, config::RegistrationConfig};
use markaz_db::{
    entities::{
        enrollment::{self, EnrollmentStatus},
        payment::{self, PaymentKind, PaymentMethod, PaymentStatus},
        program, student,
        user::{self, UserRole},
    },
    repositories::{
        EnrollmentRepository, PaymentRepository, StudentRepository, UserRepository,
        normalize_email,
    },
    run_atomic,
};
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use validator::Validate;

use super::{
    admission::{AdmissionContext, AdmissionPolicyRef},
    fees::{PaymentSummary, derive_fee_lines},
    identity::hash_password,
    program::ProgramService,
};

/// Registration form as submitted by the client.
///
/// Every field is optional on the wire so that missing fields can be
/// reported together instead of failing on the first one.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub student_name: Option<String>,
    pub birth_date: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub parent_email: Option<String>,
    pub program_id: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub payment_method: Option<String>,
    pub subsidy_amount: Option<i64>,
    pub agree_to_terms: Option<bool>,
}

/// A complete, validated registration.
#[derive(Validate)]
pub struct RegistrationInput {
    #[validate(length(max = 256))]
    pub student_name: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 1024))]
    pub address: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 256))]
    pub parent_name: String,
    #[validate(length(max = 32))]
    pub parent_phone: String,
    #[validate(email, length(max = 256))]
    pub parent_email: String,
    pub program_id: String,
    /// Login email, normalized to lower case.
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub payment_method: Option<PaymentMethod>,
    #[validate(range(min = 0))]
    pub subsidy_amount: Option<i64>,
}

impl std::fmt::Debug for RegistrationInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationInput")
            .field("student_name", &self.student_name)
            .field("program_id", &self.program_id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("payment_method", &self.payment_method)
            .field("subsidy_amount", &self.subsidy_amount)
            .finish_non_exhaustive()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<RegistrationForm> for RegistrationInput {
    type Error = AppError;

    fn try_from(form: RegistrationForm) -> AppResult<Self> {
        let mut missing = Vec::new();
        let mut required = |value: Option<String>, field: &str| {
            non_blank(value).unwrap_or_else(|| {
                missing.push(field.to_string());
                String::new()
            })
        };

        let student_name = required(form.student_name, "studentName");
        let parent_name = required(form.parent_name, "parentName");
        let parent_phone = required(form.parent_phone, "parentPhone");
        let parent_email = required(form.parent_email, "parentEmail");
        let program_id = required(form.program_id, "programId");
        let email = required(form.email, "email");

        // Whitespace is significant in passwords; only blank ones count as missing.
        let password = form
            .password
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| {
                missing.push("password".to_string());
                String::new()
            });

        if form.agree_to_terms != Some(true) {
            missing.push("agreeToTerms".to_string());
        }
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing));
        }

        let birth_date = non_blank(form.birth_date)
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d").map_err(|_| {
                    AppError::Validation("birthDate must be a date in YYYY-MM-DD format".to_string())
                })
            })
            .transpose()?;

        let payment_method = non_blank(form.payment_method)
            .map(|m| m.parse::<PaymentMethod>().map_err(AppError::Validation))
            .transpose()?;

        let input = Self {
            student_name,
            birth_date,
            address: non_blank(form.address),
            phone: non_blank(form.phone),
            parent_name,
            parent_phone,
            parent_email,
            program_id,
            email: normalize_email(&email),
            password,
            payment_method,
            subsidy_amount: form.subsidy_amount,
        };
        input.validate()?;

        Ok(input)
    }
}

/// Account created by a registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredStudent {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredEnrollment {
    pub id: String,
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredPayment {
    pub id: String,
    pub kind: PaymentKind,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredProgram {
    pub id: String,
    pub title: String,
}

/// Everything a client needs to confirm a registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub user: RegisteredUser,
    pub student: RegisteredStudent,
    pub enrollment: RegisteredEnrollment,
    pub payments: Vec<RegisteredPayment>,
    pub program: RegisteredProgram,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStatusView {
    pub id: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatusView {
    pub id: String,
    pub name: String,
    pub parent_name: String,
    pub parent_email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramStatusView {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusView {
    pub id: String,
    pub kind: PaymentKind,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub notes: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<payment::Model> for PaymentStatusView {
    fn from(p: payment::Model) -> Self {
        Self {
            id: p.id,
            kind: p.kind,
            amount: p.amount,
            method: p.method,
            status: p.status,
            notes: p.notes,
            created_at: p.created_at,
        }
    }
}

/// Current state of a registration, looked up by enrollment id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub enrollment: EnrollmentStatusView,
    pub student: StudentStatusView,
    pub program: ProgramStatusView,
    pub payments: Vec<PaymentStatusView>,
    pub summary: PaymentSummary,
}

/// Registration workflow service.
#[derive(Clone)]
pub struct RegistrationService {
    db: Arc<DatabaseConnection>,
    programs: ProgramService,
    user_repo: UserRepository,
    student_repo: StudentRepository,
    enrollment_repo: EnrollmentRepository,
    payment_repo: PaymentRepository,
    admission: AdmissionPolicyRef,
    default_method: PaymentMethod,
    id_gen: IdGenerator,
}

impl RegistrationService {
    /// Create a new registration service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        programs: ProgramService,
        admission: AdmissionPolicyRef,
        config: &RegistrationConfig,
    ) -> Self {
        let default_method = config
            .default_payment_method
            .parse()
            .unwrap_or_else(|e: String| {
                warn!(error = %e, "Invalid default payment method, using TRANSFER");
                PaymentMethod::Transfer
            });

        Self {
            user_repo: UserRepository::new(db.clone()),
            student_repo: StudentRepository::new(db.clone()),
            enrollment_repo: EnrollmentRepository::new(db.clone()),
            payment_repo: PaymentRepository::new(db.clone()),
            db,
            programs,
            admission,
            default_method,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a student for a program.
    ///
    /// Input problems, unknown programs, taken emails and admission
    /// refusals are reported before anything is written.
    pub async fn register(&self, form: RegistrationForm) -> AppResult<RegistrationOutcome> {
        let input = RegistrationInput::try_from(form)?;

        let program = self
            .programs
            .get_program(&input.program_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::ProgramNotFound(input.program_id.clone()))?;

        // Fast path only; the unique index on user.email decides races.
        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        self.check_admission(&program).await?;

        let password_hash = hash_password(&input.password)?;
        let method = input.payment_method.unwrap_or(self.default_method);
        let lines = derive_fee_lines(&program, input.subsidy_amount);

        let now: DateTime<FixedOffset> = Utc::now().into();
        let user_id = self.id_gen.generate();
        let student_id = self.id_gen.generate();
        let enrollment_id = self.id_gen.generate();

        let user_model = user::ActiveModel {
            id: Set(user_id.clone()),
            email: Set(input.email.clone()),
            name: Set(input.student_name.clone()),
            password_hash: Set(password_hash),
            role: Set(UserRole::Student),
            created_at: Set(now),
            updated_at: Set(None),
        };

        let student_model = student::ActiveModel {
            id: Set(student_id.clone()),
            user_id: Set(user_id),
            name: Set(input.student_name.clone()),
            birth_date: Set(input.birth_date),
            address: Set(input.address.clone()),
            phone: Set(input.phone.clone()),
            parent_name: Set(input.parent_name.clone()),
            parent_phone: Set(input.parent_phone.clone()),
            parent_email: Set(input.parent_email.clone()),
            is_active: Set(true),
            created_at: Set(now),
        };

        let enrollment_model = enrollment::ActiveModel {
            id: Set(enrollment_id.clone()),
            student_id: Set(student_id.clone()),
            program_id: Set(program.id.clone()),
            status: Set(EnrollmentStatus::Pending),
            enrolled_at: Set(now),
            updated_at: Set(None),
        };

        let payment_models: Vec<payment::ActiveModel> = lines
            .into_iter()
            .map(|line| payment::ActiveModel {
                id: Set(self.id_gen.generate()),
                enrollment_id: Set(enrollment_id.clone()),
                student_id: Set(student_id.clone()),
                kind: Set(line.kind),
                amount: Set(line.amount),
                method: Set(method),
                status: Set(PaymentStatus::Pending),
                notes: Set(line.notes),
                created_at: Set(now),
                reviewed_at: Set(None),
            })
            .collect();

        let users = self.user_repo.clone();
        let students = self.student_repo.clone();
        let enrollments = self.enrollment_repo.clone();
        let payments = self.payment_repo.clone();

        let (user, student, enrollment, payments) = run_atomic(self.db.as_ref(), move |txn| {
            Box::pin(async move {
                let user = users.create_in(txn, user_model).await?;
                let student = students.create_in(txn, student_model).await?;
                let enrollment = enrollments.create_in(txn, enrollment_model).await?;

                let mut created = Vec::with_capacity(payment_models.len());
                for model in payment_models {
                    created.push(payments.create_in(txn, model).await?);
                }

                Ok::<_, AppError>((user, student, enrollment, created))
            })
        })
        .await
        .inspect_err(|e| {
            if e.is_server_error() {
                error!(
                    program_id = %program.id,
                    email = %input.email,
                    error = %e,
                    "Registration failed"
                );
            }
        })?;

        info!(
            enrollment_id = %enrollment.id,
            program_id = %program.id,
            payments = payments.len(),
            "Registration completed"
        );

        Ok(RegistrationOutcome {
            user: RegisteredUser {
                id: user.id,
                email: user.email,
                name: user.name,
            },
            student: RegisteredStudent {
                id: student.id,
                name: student.name,
            },
            enrollment: RegisteredEnrollment {
                id: enrollment.id,
                status: enrollment.status,
            },
            payments: payments
                .into_iter()
                .map(|p| RegisteredPayment {
                    id: p.id,
                    kind: p.kind,
                    amount: p.amount,
                    method: p.method,
                    status: p.status,
                })
                .collect(),
            program: RegisteredProgram {
                id: program.id,
                title: program.title,
            },
        })
    }

    /// Look up a registration by its enrollment id.
    pub async fn status(&self, enrollment_id: &str) -> AppResult<RegistrationStatus> {
        let enrollment = self.enrollment_repo.get_by_id(enrollment_id).await?;
        let student = self.student_repo.get_by_id(&enrollment.student_id).await?;
        let program = self.programs.get(&enrollment.program_id).await?;
        let payments = self
            .payment_repo
            .find_by_enrollment_id(&enrollment.id)
            .await?;

        let summary = PaymentSummary::from_payments(&payments);

        Ok(RegistrationStatus {
            enrollment: EnrollmentStatusView {
                id: enrollment.id,
                status: enrollment.status,
                enrolled_at: enrollment.enrolled_at,
            },
            student: StudentStatusView {
                id: student.id,
                name: student.name,
                parent_name: student.parent_name,
                parent_email: student.parent_email,
            },
            program: ProgramStatusView {
                title: program.title,
                description: program.description,
            },
            payments: payments.into_iter().map(PaymentStatusView::from).collect(),
            summary,
        })
    }

    async fn check_admission(&self, program: &program::Model) -> AppResult<()> {
        let occupied = if program.capacity.is_some() && self.admission.needs_occupancy() {
            self.enrollment_repo
                .count_occupying_by_program(&program.id)
                .await?
        } else {
            0
        };

        self.admission.admit(&AdmissionContext {
            program_id: program.id.clone(),
            capacity: program.capacity,
            occupied,
        })
    }
}
