//! Fee derivation.
//!
//! Turns a program's fee schedule into the payment obligations created for a
//! new enrollment, and folds an enrollment's payments back into a summary.

use markaz_db::entities::{
    payment::{self, PaymentKind, PaymentStatus},
    program,
};
use serde::Serialize;

/// One positive fee obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeLine {
    pub kind: PaymentKind,
    pub amount: i64,
    pub notes: String,
}

/// Derive the payment lines owed for enrolling in `program`.
///
/// Registration, book and tuition are checked independently and in that
/// order; a component whose amount is not positive produces no line. The
/// tuition amount is the monthly fee minus `subsidy`, floored at zero.
#[must_use]
pub fn derive_fee_lines(program: &program::Model, subsidy: Option<i64>) -> Vec<FeeLine> {
    let mut lines = Vec::with_capacity(3);

    if program.registration_fee > 0 {
        lines.push(FeeLine {
            kind: PaymentKind::Registration,
            amount: program.registration_fee,
            notes: "registration fee".to_string(),
        });
    }

    if program.book_fee > 0 {
        lines.push(FeeLine {
            kind: PaymentKind::Book,
            amount: program.book_fee,
            notes: "book fee".to_string(),
        });
    }

    let subsidy = subsidy.filter(|s| *s > 0);
    let tuition = program
        .monthly_fee
        .saturating_sub(subsidy.unwrap_or(0))
        .max(0);
    if tuition > 0 {
        let notes = match subsidy {
            Some(s) => format!("monthly tuition (subsidy {s} applied)"),
            None => "monthly tuition".to_string(),
        };
        lines.push(FeeLine {
            kind: PaymentKind::Tuition,
            amount: tuition,
            notes,
        });
    }

    lines
}

/// Financial status of an enrollment, derived from its payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    /// Sum of payments that are still owed or already settled.
    pub total_due: i64,
    pub total_approved: i64,
    pub outstanding: i64,
    /// True when every payment has been approved.
    pub all_approved: bool,
}

impl PaymentSummary {
    #[must_use]
    pub fn from_payments(payments: &[payment::Model]) -> Self {
        let mut total_due = 0_i64;
        let mut total_approved = 0_i64;

        for p in payments {
            match p.status {
                PaymentStatus::Pending => total_due += p.amount,
                PaymentStatus::Approved => {
                    total_due += p.amount;
                    total_approved += p.amount;
                }
                PaymentStatus::Rejected | PaymentStatus::Cancelled => {}
            }
        }

        Self {
            total_due,
            total_approved,
            outstanding: total_due - total_approved,
            all_approved: payments
                .iter()
                .all(|p| p.status == PaymentStatus::Approved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use markaz_db::entities::payment::PaymentMethod;

    fn program(registration_fee: i64, book_fee: i64, monthly_fee: i64) -> program::Model {
        program::Model {
            id: "prog1".to_string(),
            title: "Tahfidz".to_string(),
            description: None,
            registration_fee,
            book_fee,
            monthly_fee,
            capacity: None,
            is_active: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn payment(amount: i64, status: PaymentStatus) -> payment::Model {
        payment::Model {
            id: format!("pay{amount}"),
            enrollment_id: "enr1".to_string(),
            student_id: "student1".to_string(),
            kind: PaymentKind::Registration,
            amount,
            method: PaymentMethod::Transfer,
            status,
            notes: String::new(),
            created_at: Utc::now().into(),
            reviewed_at: None,
        }
    }

    #[test]
    fn test_all_fees_without_subsidy() {
        let lines = derive_fee_lines(&program(50_000, 100_000, 300_000), None);

        let amounts: Vec<i64> = lines.iter().map(|l| l.amount).collect();
        assert_eq!(amounts, vec![50_000, 100_000, 300_000]);
        assert_eq!(
            lines.iter().map(|l| l.kind).collect::<Vec<_>>(),
            vec![PaymentKind::Registration, PaymentKind::Book, PaymentKind::Tuition]
        );
        assert_eq!(lines[0].notes, "registration fee");
        assert_eq!(lines[1].notes, "book fee");
        assert_eq!(lines[2].notes, "monthly tuition");
    }

    #[test]
    fn test_free_program_has_no_lines() {
        assert!(derive_fee_lines(&program(0, 0, 0), None).is_empty());
        assert!(derive_fee_lines(&program(0, 0, 0), Some(10_000)).is_empty());
    }

    #[test]
    fn test_full_subsidy_drops_tuition() {
        let lines = derive_fee_lines(&program(50_000, 75_000, 250_000), Some(250_000));

        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.kind != PaymentKind::Tuition));
        assert_eq!(lines.iter().map(|l| l.amount).sum::<i64>(), 125_000);
    }

    #[test]
    fn test_subsidy_larger_than_monthly_fee_is_clamped() {
        let lines = derive_fee_lines(&program(0, 0, 100_000), Some(400_000));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_partial_subsidy_is_annotated() {
        let lines = derive_fee_lines(&program(0, 0, 300_000), Some(100_000));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount, 200_000);
        assert_eq!(lines[0].notes, "monthly tuition (subsidy 100000 applied)");
    }

    #[test]
    fn test_zero_subsidy_is_not_annotated() {
        let lines = derive_fee_lines(&program(0, 0, 300_000), Some(0));
        assert_eq!(lines[0].notes, "monthly tuition");
    }

    #[test]
    fn test_components_are_independent() {
        let lines = derive_fee_lines(&program(0, 100_000, 0), None);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].kind, PaymentKind::Book);
    }

    #[test]
    fn test_summary() {
        let payments = vec![
            payment(50_000, PaymentStatus::Approved),
            payment(100_000, PaymentStatus::Pending),
            payment(300_000, PaymentStatus::Rejected),
        ];

        let summary = PaymentSummary::from_payments(&payments);
        assert_eq!(summary.total_due, 150_000);
        assert_eq!(summary.total_approved, 50_000);
        assert_eq!(summary.outstanding, 100_000);
        assert!(!summary.all_approved);
    }

    #[test]
    fn test_summary_all_approved() {
        let payments = vec![
            payment(50_000, PaymentStatus::Approved),
            payment(100_000, PaymentStatus::Approved),
        ];

        let summary = PaymentSummary::from_payments(&payments);
        assert_eq!(summary.outstanding, 0);
        assert!(summary.all_approved);
    }
}
