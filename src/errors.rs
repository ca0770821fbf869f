use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{ClientId, InstallmentId, LoanId};

#[derive(Error, Debug)]
pub enum LoanError {
    // structural input errors: contract violations in the pure functions
    #[error("invalid principal: {principal} (must be positive)")]
    InvalidPrincipal {
        principal: Money,
    },

    #[error("invalid term count: {term_count} (must be at least 1)")]
    InvalidTermCount {
        term_count: u32,
    },

    #[error("invalid interest rate: {rate} (must not be negative)")]
    InvalidRate {
        rate: Rate,
    },

    // business rule violations: expected, recoverable, nothing persisted
    #[error("the minimum loan amount is S/ {minimum}")]
    PrincipalBelowMinimum {
        principal: Money,
        minimum: Money,
    },

    #[error("the maximum loan amount is S/ {maximum}")]
    PrincipalAboveMaximum {
        principal: Money,
        maximum: Money,
    },

    #[error("the minimum annual rate is {floor}")]
    RateBelowFloor {
        rate: Rate,
        floor: Rate,
    },

    #[error("the term must be between {minimum} and {maximum} months")]
    TermOutOfBounds {
        term_count: u32,
        minimum: u32,
        maximum: u32,
    },

    #[error("the loan start date cannot be in the past")]
    StartDateInPast {
        start_date: NaiveDate,
        today: NaiveDate,
    },

    #[error("amounts from S/ {threshold} require the signed legal declaration to be accepted")]
    DeclarationRequired {
        principal: Money,
        threshold: Money,
    },

    #[error("the client already has an active loan")]
    ClientHasActiveLoan {
        client_id: ClientId,
        loan_id: LoanId,
    },

    // lookups
    #[error("client not found: {id}")]
    ClientNotFound {
        id: ClientId,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("installment {installment_id} not found on loan {loan_id}")]
    InstallmentNotFound {
        loan_id: LoanId,
        installment_id: InstallmentId,
    },

    // store boundary
    #[error("concurrent modification detected: {message}")]
    ConcurrencyConflict {
        message: String,
    },
}

impl LoanError {
    /// conflicts are safe to retry; everything else reflects input or state
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoanError::ConcurrencyConflict { .. })
    }

    /// structural errors are programming/contract faults, not user input
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            LoanError::InvalidPrincipal { .. }
                | LoanError::InvalidTermCount { .. }
                | LoanError::InvalidRate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
