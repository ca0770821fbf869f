use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::BusinessCalendar;
use crate::types::{Installment, InstallmentStatus, LoanStatus};

/// read-time view of one installment
///
/// The persisted status is never rewritten here; an unpaid row past its due
/// date *displays* as overdue while remaining Pending in the store until the
/// reconciliation sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStatus {
    pub computed_status: InstallmentStatus,
    pub days_overdue: u32,
}

/// classify one installment against the injected "today"
///
/// All comparisons are date-only in the business timezone.
pub fn resolve_installment(
    installment: &Installment,
    today: NaiveDate,
    calendar: &BusinessCalendar,
) -> ResolvedStatus {
    let due = installment.due_date;

    if let Some(paid_at) = installment.paid_at {
        let paid_date = calendar.civil_date(paid_at);
        let late_by = calendar.days_between(due, paid_date).max(0);
        return ResolvedStatus {
            computed_status: InstallmentStatus::Paid,
            days_overdue: late_by as u32,
        };
    }

    if installment.status != InstallmentStatus::Paid && today > due {
        return ResolvedStatus {
            computed_status: InstallmentStatus::Overdue,
            days_overdue: calendar.days_between(due, today) as u32,
        };
    }

    ResolvedStatus {
        computed_status: installment.status,
        days_overdue: 0,
    }
}

/// multiset of persisted installment statuses for one loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u32,
    pub paid: u32,
    pub overdue: u32,
}

impl StatusCounts {
    pub fn total(&self) -> u32 {
        self.pending + self.paid + self.overdue
    }

    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = InstallmentStatus>,
    {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                InstallmentStatus::Pending => counts.pending += 1,
                InstallmentStatus::Paid => counts.paid += 1,
                InstallmentStatus::Overdue => counts.overdue += 1,
            }
        }
        counts
    }

    pub fn from_installments<'a, I>(installments: I) -> Self
    where
        I: IntoIterator<Item = &'a Installment>,
    {
        Self::from_statuses(installments.into_iter().map(|i| i.status))
    }

    /// roll the counts up into a loan status
    ///
    /// Precedence: all paid wins, then any persisted overdue, then active.
    /// A pure function of the current counts; the order of the mutations
    /// that produced them is irrelevant.
    pub fn aggregate(&self) -> LoanStatus {
        if self.total() > 0 && self.paid == self.total() {
            LoanStatus::Paid
        } else if self.overdue > 0 {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn installment(
        due: (i32, u32, u32),
        status: InstallmentStatus,
        paid_at: Option<chrono::DateTime<Utc>>,
    ) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            loan_id: Uuid::new_v4(),
            installment_number: 1,
            due_date: NaiveDate::from_ymd_opt(due.0, due.1, due.2).unwrap(),
            installment_amount: Money::from_decimal(dec!(88.85)),
            principal_amount: Money::from_decimal(dec!(78.85)),
            interest_amount: Money::from_decimal(dec!(10.00)),
            remaining_balance: Money::from_decimal(dec!(921.15)),
            status,
            paid_at,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unpaid_past_due_resolves_overdue() {
        let calendar = BusinessCalendar::default();
        let row = installment((2024, 2, 15), InstallmentStatus::Pending, None);
        let resolved = resolve_installment(&row, date(2024, 2, 20), &calendar);
        assert_eq!(resolved.computed_status, InstallmentStatus::Overdue);
        assert_eq!(resolved.days_overdue, 5);
    }

    #[test]
    fn test_unpaid_on_due_date_stays_pending() {
        let calendar = BusinessCalendar::default();
        let row = installment((2024, 2, 15), InstallmentStatus::Pending, None);
        let resolved = resolve_installment(&row, date(2024, 2, 15), &calendar);
        assert_eq!(resolved.computed_status, InstallmentStatus::Pending);
        assert_eq!(resolved.days_overdue, 0);
    }

    #[test]
    fn test_paid_on_time_has_no_overdue_days() {
        let calendar = BusinessCalendar::default();
        // paid at noon UTC on the due date (07:00 business time)
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 15, 12, 0, 0).unwrap();
        let row = installment((2024, 2, 15), InstallmentStatus::Paid, Some(paid_at));
        let resolved = resolve_installment(&row, date(2024, 6, 1), &calendar);
        assert_eq!(resolved.computed_status, InstallmentStatus::Paid);
        assert_eq!(resolved.days_overdue, 0);
    }

    #[test]
    fn test_paid_late_reports_days_late() {
        let calendar = BusinessCalendar::default();
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 25, 12, 0, 0).unwrap();
        let row = installment((2024, 2, 15), InstallmentStatus::Paid, Some(paid_at));
        let resolved = resolve_installment(&row, date(2024, 2, 16), &calendar);
        assert_eq!(resolved.computed_status, InstallmentStatus::Paid);
        assert_eq!(resolved.days_overdue, 10);
    }

    #[test]
    fn test_paid_early_clamps_to_zero() {
        let calendar = BusinessCalendar::default();
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let row = installment((2024, 2, 15), InstallmentStatus::Paid, Some(paid_at));
        let resolved = resolve_installment(&row, date(2024, 3, 1), &calendar);
        assert_eq!(resolved.days_overdue, 0);
    }

    #[test]
    fn test_persisted_overdue_passes_through() {
        let calendar = BusinessCalendar::default();
        let row = installment((2024, 2, 15), InstallmentStatus::Overdue, None);
        let resolved = resolve_installment(&row, date(2024, 3, 1), &calendar);
        assert_eq!(resolved.computed_status, InstallmentStatus::Overdue);
        assert_eq!(resolved.days_overdue, 15);
    }

    #[test]
    fn test_aggregate_all_paid() {
        let counts = StatusCounts { pending: 0, paid: 12, overdue: 0 };
        assert_eq!(counts.aggregate(), LoanStatus::Paid);
    }

    #[test]
    fn test_aggregate_any_overdue_wins_over_active() {
        let counts = StatusCounts { pending: 10, paid: 1, overdue: 1 };
        assert_eq!(counts.aggregate(), LoanStatus::Overdue);
    }

    #[test]
    fn test_aggregate_otherwise_active() {
        let counts = StatusCounts { pending: 11, paid: 1, overdue: 0 };
        assert_eq!(counts.aggregate(), LoanStatus::Active);
        let counts = StatusCounts { pending: 12, paid: 0, overdue: 0 };
        assert_eq!(counts.aggregate(), LoanStatus::Active);
    }

    #[test]
    fn test_counts_from_statuses() {
        let counts = StatusCounts::from_statuses([
            InstallmentStatus::Paid,
            InstallmentStatus::Pending,
            InstallmentStatus::Overdue,
            InstallmentStatus::Paid,
        ]);
        assert_eq!(counts, StatusCounts { pending: 1, paid: 2, overdue: 1 });
        assert_eq!(counts.total(), 4);
    }
}
