//! Database entities.

#![allow(missing_docs)]

pub mod enrollment;
pub mod payment;
pub mod program;
pub mod student;
pub mod user;

pub use enrollment::Entity as Enrollment;
pub use payment::Entity as Payment;
pub use program::Entity as Program;
pub use student::Entity as Student;
pub use user::Entity as User;
