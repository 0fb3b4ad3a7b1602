//! Repositories wrapping entity queries.

mod enrollment;
mod payment;
mod program;
mod student;
mod user;

pub use enrollment::{EnrollmentFilter, EnrollmentRepository};
pub use payment::PaymentRepository;
pub use program::ProgramRepository;
pub use student::StudentRepository;
pub use user::{UserRepository, normalize_email};
