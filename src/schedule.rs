use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::LoanTerms;

/// one generated schedule row, before persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub installment_amount: Money,
    pub principal_amount: Money,
    pub interest_amount: Money,
    /// outstanding principal after this installment is applied
    pub remaining_balance: Money,
}

/// full amortization schedule for a set of loan terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub terms: LoanTerms,
    pub rows: Vec<ScheduleRow>,
    /// the constant payment every row except possibly the last carries
    pub level_payment: Money,
    pub total_interest: Money,
    pub total_amount: Money,
}

impl AmortizationSchedule {
    /// generate the level-payment schedule for the given terms
    ///
    /// Deterministic: identical terms yield identical output. Business
    /// bounds are the creation policy's job; this only rejects terms that
    /// are structurally meaningless.
    pub fn generate(terms: LoanTerms) -> Result<Self> {
        if !terms.principal.is_positive() {
            return Err(LoanError::InvalidPrincipal {
                principal: terms.principal,
            });
        }
        if terms.term_count == 0 {
            return Err(LoanError::InvalidTermCount {
                term_count: terms.term_count,
            });
        }
        if terms.interest_rate.is_negative() {
            return Err(LoanError::InvalidRate {
                rate: terms.interest_rate,
            });
        }

        let monthly_rate = terms.interest_rate.monthly_rate();
        let payment = level_payment_amount(terms.principal, monthly_rate, terms.term_count);

        let mut rows = Vec::with_capacity(terms.term_count as usize);
        let mut balance = terms.principal;

        for k in 1..=terms.term_count {
            let due_date = add_months(terms.start_date, k);
            let interest_amount = balance * monthly_rate;

            let (installment_amount, principal_amount, ending_balance) =
                if k == terms.term_count {
                    // final row absorbs the rounding residue so the balance
                    // terminates at exactly zero
                    (balance + interest_amount, balance, Money::ZERO)
                } else {
                    let principal_amount = payment - interest_amount;
                    (payment, principal_amount, balance - principal_amount)
                };

            rows.push(ScheduleRow {
                installment_number: k,
                due_date,
                installment_amount,
                principal_amount,
                interest_amount,
                remaining_balance: ending_balance,
            });

            balance = ending_balance;
        }

        let total_interest = rows.iter().map(|r| r.interest_amount).sum();
        let total_amount = rows.iter().map(|r| r.installment_amount).sum();

        Ok(Self {
            terms,
            rows,
            level_payment: payment,
            total_interest,
            total_amount,
        })
    }

    /// due date of the final installment
    pub fn last_due_date(&self) -> NaiveDate {
        self.rows
            .last()
            .map(|r| r.due_date)
            .unwrap_or(self.terms.start_date)
    }
}

/// level payment: P * i * (1+i)^n / ((1+i)^n - 1), or P/n at zero rate
fn level_payment_amount(principal: Money, monthly_rate: Decimal, term_count: u32) -> Money {
    if monthly_rate.is_zero() {
        return principal / Decimal::from(term_count);
    }

    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + monthly_rate;
    for _ in 0..term_count {
        compound *= base;
    }

    let numerator = principal.as_decimal() * monthly_rate * compound;
    let denominator = compound - Decimal::ONE;
    Money::from_decimal(numerator / denominator)
}

/// advance a civil date by whole calendar months, clamping the day-of-month
/// to the last valid day of the target month
fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is valid for month")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => unreachable!("month out of range"),
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use rust_decimal_macros::dec;

    fn terms(principal: Decimal, rate: Decimal, term_count: u32, start: (i32, u32, u32)) -> LoanTerms {
        LoanTerms {
            principal: Money::from_decimal(principal),
            interest_rate: Rate::from_decimal(rate),
            term_count,
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
        }
    }

    #[test]
    fn test_reference_schedule_1000_at_12pct_over_12_months() {
        let schedule =
            AmortizationSchedule::generate(terms(dec!(1000), dec!(0.12), 12, (2024, 1, 15)))
                .unwrap();

        assert_eq!(schedule.rows.len(), 12);
        assert_eq!(schedule.level_payment, Money::from_decimal(dec!(88.85)));

        let first = &schedule.rows[0];
        assert_eq!(first.due_date, NaiveDate::from_ymd_opt(2024, 2, 15).unwrap());
        assert_eq!(first.interest_amount, Money::from_decimal(dec!(10.00)));
        assert_eq!(first.principal_amount, Money::from_decimal(dec!(78.85)));
        assert_eq!(first.remaining_balance, Money::from_decimal(dec!(921.15)));

        let second = &schedule.rows[1];
        assert_eq!(second.interest_amount, Money::from_decimal(dec!(9.21)));
        assert_eq!(second.remaining_balance, Money::from_decimal(dec!(841.51)));

        let last = schedule.rows.last().unwrap();
        assert_eq!(last.remaining_balance, Money::ZERO);
        assert_eq!(
            last.installment_amount,
            last.principal_amount + last.interest_amount
        );

        let principal_sum: Money = schedule.rows.iter().map(|r| r.principal_amount).sum();
        assert_eq!(principal_sum, Money::from_major(1000));
    }

    #[test]
    fn test_every_row_decomposes_exactly() {
        let schedule =
            AmortizationSchedule::generate(terms(dec!(15000), dec!(0.35), 48, (2025, 3, 1)))
                .unwrap();
        for row in &schedule.rows {
            assert_eq!(
                row.installment_amount,
                row.principal_amount + row.interest_amount,
                "row {} does not decompose",
                row.installment_number
            );
        }
    }

    #[test]
    fn test_balance_is_strictly_decreasing_to_zero() {
        let schedule =
            AmortizationSchedule::generate(terms(dec!(5350), dec!(0.10), 24, (2025, 6, 30)))
                .unwrap();
        let mut previous = schedule.terms.principal;
        for row in &schedule.rows {
            assert!(row.remaining_balance < previous);
            previous = row.remaining_balance;
        }
        assert_eq!(schedule.rows.last().unwrap().remaining_balance, Money::ZERO);
    }

    #[test]
    fn test_numbers_and_due_dates_strictly_increase() {
        let schedule =
            AmortizationSchedule::generate(terms(dec!(2000), dec!(0.18), 18, (2024, 7, 5)))
                .unwrap();
        for pair in schedule.rows.windows(2) {
            assert_eq!(pair[1].installment_number, pair[0].installment_number + 1);
            assert!(pair[1].due_date > pair[0].due_date);
        }
        assert_eq!(schedule.rows[0].installment_number, 1);
    }

    #[test]
    fn test_zero_rate_splits_principal_evenly() {
        let schedule =
            AmortizationSchedule::generate(terms(dec!(1200), dec!(0), 12, (2024, 1, 1))).unwrap();
        assert_eq!(schedule.level_payment, Money::from_major(100));
        assert_eq!(schedule.total_interest, Money::ZERO);
        assert_eq!(schedule.total_amount, Money::from_major(1200));
        assert_eq!(schedule.rows.last().unwrap().remaining_balance, Money::ZERO);
    }

    #[test]
    fn test_zero_rate_residue_lands_on_last_row() {
        // 1000 / 6 = 166.67 rounded; the last row gives back the extra cents
        let schedule =
            AmortizationSchedule::generate(terms(dec!(1000), dec!(0), 6, (2024, 1, 1))).unwrap();
        assert_eq!(schedule.level_payment, Money::from_decimal(dec!(166.67)));
        let last = schedule.rows.last().unwrap();
        assert_eq!(last.principal_amount, Money::from_decimal(dec!(166.65)));
        let principal_sum: Money = schedule.rows.iter().map(|r| r.principal_amount).sum();
        assert_eq!(principal_sum, Money::from_major(1000));
    }

    #[test]
    fn test_month_end_start_dates_clamp() {
        let schedule =
            AmortizationSchedule::generate(terms(dec!(1000), dec!(0.12), 6, (2024, 1, 31)))
                .unwrap();
        let due: Vec<NaiveDate> = schedule.rows.iter().map(|r| r.due_date).collect();
        assert_eq!(due[0], NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()); // leap year
        assert_eq!(due[1], NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(due[2], NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(due[3], NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
    }

    #[test]
    fn test_add_months_crosses_year_boundary() {
        let start = NaiveDate::from_ymd_opt(2024, 11, 30).unwrap();
        assert_eq!(add_months(start, 3), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(add_months(start, 14), NaiveDate::from_ymd_opt(2026, 1, 30).unwrap());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let t = terms(dec!(7500), dec!(0.25), 36, (2025, 2, 28));
        let a = AmortizationSchedule::generate(t).unwrap();
        let b = AmortizationSchedule::generate(t).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_structural_input_errors() {
        let err = AmortizationSchedule::generate(terms(dec!(0), dec!(0.12), 12, (2024, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidPrincipal { .. }));

        let err = AmortizationSchedule::generate(terms(dec!(1000), dec!(0.12), 0, (2024, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidTermCount { .. }));

        let err = AmortizationSchedule::generate(terms(dec!(1000), dec!(-0.01), 12, (2024, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, LoanError::InvalidRate { .. }));
    }

    #[test]
    fn test_totals_match_row_sums() {
        let schedule =
            AmortizationSchedule::generate(terms(dec!(9999.99), dec!(0.22), 30, (2025, 8, 14)))
                .unwrap();
        let interest: Money = schedule.rows.iter().map(|r| r.interest_amount).sum();
        let amount: Money = schedule.rows.iter().map(|r| r.installment_amount).sum();
        assert_eq!(schedule.total_interest, interest);
        assert_eq!(schedule.total_amount, amount);
        assert_eq!(
            schedule.last_due_date(),
            schedule.rows.last().unwrap().due_date
        );
    }
}
