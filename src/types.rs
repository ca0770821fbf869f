use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};

/// unique identifier for a client
pub type ClientId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for an installment
pub type InstallmentId = Uuid;

/// identity of the actor that created a record
pub type ActorId = Uuid;

/// rolled-up loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// at least one installment outstanding, none persisted overdue
    Active,
    /// every installment paid
    Paid,
    /// at least one installment persisted overdue
    Overdue,
}

/// persisted installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    /// written by the overdue reconciliation sweep, never by the toggle path
    Overdue,
}

/// borrower identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    /// national identity document number
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl Client {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// terms a loan is generated from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    /// nominal annual rate, fractional (0.10 = 10%)
    pub interest_rate: Rate,
    /// number of monthly installments
    pub term_count: u32,
    /// civil date in the business timezone
    pub start_date: NaiveDate,
}

/// a tracked loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub client_id: ClientId,
    pub created_by: ActorId,
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_count: u32,
    pub start_date: NaiveDate,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms {
            principal: self.principal,
            interest_rate: self.interest_rate,
            term_count: self.term_count,
            start_date: self.start_date,
        }
    }

    /// a loan counts against the single-active-loan rule until fully paid
    pub fn is_open(&self) -> bool {
        self.status != LoanStatus::Paid
    }
}

/// one persisted schedule row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    /// 1-based position, unique within the loan
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub installment_amount: Money,
    pub principal_amount: Money,
    pub interest_amount: Money,
    /// outstanding principal after this installment is applied
    pub remaining_balance: Money,
    pub status: InstallmentStatus,
    /// set iff status is Paid
    pub paid_at: Option<DateTime<Utc>>,
}
