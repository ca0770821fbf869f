use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::{LoanError, Result};
use crate::status::StatusCounts;
use crate::types::{
    Client, ClientId, Installment, InstallmentId, InstallmentStatus, Loan, LoanId, LoanStatus,
};

/// result of one paid/unpaid toggle, captured inside the transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub installment: Installment,
    pub previous_loan_status: LoanStatus,
    pub loan_status: LoanStatus,
}

/// one loan touched by the overdue reconciliation sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub loan_id: LoanId,
    pub marked: Vec<Installment>,
    pub previous_loan_status: LoanStatus,
    pub loan_status: LoanStatus,
}

/// persistence boundary for loans and their schedules
///
/// Implementations carry the engine's atomicity obligations:
///
/// - `create_loan` persists the loan and every installment as one atomic
///   unit, and enforces the single-active-loan rule for the client inside
///   the same critical section. A backend that detects the race after the
///   fact (optimistic concurrency, serializable isolation) must surface it
///   as `LoanError::ConcurrencyConflict`, which callers may retry.
/// - `set_installment_paid` applies the toggle and the loan-status
///   re-aggregation atomically; no reader may observe the toggle with a
///   stale loan status.
/// - `mark_overdue` reclassifies due-and-unpaid installments and
///   re-aggregates, atomically per loan.
///
/// Reads are projections of committed state and take no caller-visible locks.
pub trait LoanStore {
    fn insert_client(&self, client: Client) -> Result<Client>;
    fn get_client(&self, id: ClientId) -> Result<Client>;
    fn get_loan(&self, id: LoanId) -> Result<Loan>;
    /// ordered by installment number
    fn loan_installments(&self, id: LoanId) -> Result<Vec<Installment>>;
    fn client_loans(&self, id: ClientId) -> Result<Vec<Loan>>;
    fn create_loan(&self, loan: Loan, installments: Vec<Installment>) -> Result<Loan>;
    fn set_installment_paid(
        &self,
        loan_id: LoanId,
        installment_id: InstallmentId,
        paid: bool,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<ToggleOutcome>;
    fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<SweepOutcome>>;
}

#[derive(Debug, Default)]
struct Ledger {
    clients: HashMap<ClientId, Client>,
    loans: HashMap<LoanId, Loan>,
    /// kept sorted by installment number
    installments: HashMap<LoanId, Vec<Installment>>,
}

/// in-memory store
///
/// A single mutex over the ledger serializes every mutation, which makes
/// the check-then-create sequence for the single-active-loan rule safe by
/// construction. A poisoned lock (a writer panicked mid-transaction) is
/// reported as a retryable conflict rather than unwound further.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| LoanError::ConcurrencyConflict {
                message: "store lock poisoned by a failed writer".to_string(),
            })
    }
}

impl LoanStore for MemoryStore {
    fn insert_client(&self, client: Client) -> Result<Client> {
        let mut ledger = self.lock()?;
        ledger.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn get_client(&self, id: ClientId) -> Result<Client> {
        let ledger = self.lock()?;
        ledger
            .clients
            .get(&id)
            .cloned()
            .ok_or(LoanError::ClientNotFound { id })
    }

    fn get_loan(&self, id: LoanId) -> Result<Loan> {
        let ledger = self.lock()?;
        ledger
            .loans
            .get(&id)
            .cloned()
            .ok_or(LoanError::LoanNotFound { id })
    }

    fn loan_installments(&self, id: LoanId) -> Result<Vec<Installment>> {
        let ledger = self.lock()?;
        if !ledger.loans.contains_key(&id) {
            return Err(LoanError::LoanNotFound { id });
        }
        Ok(ledger.installments.get(&id).cloned().unwrap_or_default())
    }

    fn client_loans(&self, id: ClientId) -> Result<Vec<Loan>> {
        let ledger = self.lock()?;
        if !ledger.clients.contains_key(&id) {
            return Err(LoanError::ClientNotFound { id });
        }
        let mut loans: Vec<Loan> = ledger
            .loans
            .values()
            .filter(|l| l.client_id == id)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.created_at);
        Ok(loans)
    }

    fn create_loan(&self, loan: Loan, mut installments: Vec<Installment>) -> Result<Loan> {
        let mut ledger = self.lock()?;

        if !ledger.clients.contains_key(&loan.client_id) {
            return Err(LoanError::ClientNotFound { id: loan.client_id });
        }

        // single-active-loan rule, evaluated under the same lock that
        // performs the insert: no concurrent creation can interleave here
        if let Some(open) = ledger
            .loans
            .values()
            .find(|l| l.client_id == loan.client_id && l.is_open())
        {
            return Err(LoanError::ClientHasActiveLoan {
                client_id: loan.client_id,
                loan_id: open.id,
            });
        }

        installments.sort_by_key(|i| i.installment_number);
        ledger.installments.insert(loan.id, installments);
        ledger.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn set_installment_paid(
        &self,
        loan_id: LoanId,
        installment_id: InstallmentId,
        paid: bool,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<ToggleOutcome> {
        let mut ledger = self.lock()?;

        let previous_loan_status = ledger
            .loans
            .get(&loan_id)
            .ok_or(LoanError::LoanNotFound { id: loan_id })?
            .status;

        let rows = ledger
            .installments
            .get_mut(&loan_id)
            .ok_or(LoanError::LoanNotFound { id: loan_id })?;

        let row = rows
            .iter_mut()
            .find(|i| i.id == installment_id)
            .ok_or(LoanError::InstallmentNotFound {
                loan_id,
                installment_id,
            })?;

        if paid {
            row.status = InstallmentStatus::Paid;
            row.paid_at = paid_at;
        } else {
            row.status = InstallmentStatus::Pending;
            row.paid_at = None;
        }
        let updated = row.clone();

        // re-aggregate inside the same critical section as the toggle
        let loan_status = StatusCounts::from_installments(rows.iter()).aggregate();
        if let Some(loan) = ledger.loans.get_mut(&loan_id) {
            loan.status = loan_status;
        }

        Ok(ToggleOutcome {
            installment: updated,
            previous_loan_status,
            loan_status,
        })
    }

    fn mark_overdue(&self, today: NaiveDate) -> Result<Vec<SweepOutcome>> {
        let mut ledger = self.lock()?;
        let mut outcomes = Vec::new();

        let mut open_loans: Vec<(chrono::DateTime<Utc>, LoanId)> = ledger
            .loans
            .values()
            .filter(|l| l.is_open())
            .map(|l| (l.created_at, l.id))
            .collect();
        // walk loans in creation order so sweep output is deterministic
        open_loans.sort();
        let loan_ids: Vec<LoanId> = open_loans.into_iter().map(|(_, id)| id).collect();

        for loan_id in loan_ids {
            let rows = match ledger.installments.get_mut(&loan_id) {
                Some(rows) => rows,
                None => continue,
            };

            let mut marked = Vec::new();
            for row in rows.iter_mut() {
                if row.status == InstallmentStatus::Pending && row.due_date < today {
                    row.status = InstallmentStatus::Overdue;
                    marked.push(row.clone());
                }
            }
            if marked.is_empty() {
                continue;
            }

            let loan_status = StatusCounts::from_installments(rows.iter()).aggregate();
            if let Some(loan) = ledger.loans.get_mut(&loan_id) {
                let previous_loan_status = loan.status;
                loan.status = loan_status;
                outcomes.push(SweepOutcome {
                    loan_id,
                    marked,
                    previous_loan_status,
                    loan_status,
                });
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::schedule::AmortizationSchedule;
    use crate::types::LoanTerms;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn seed_client(store: &MemoryStore) -> Client {
        store
            .insert_client(Client {
                id: Uuid::new_v4(),
                national_id: "45671234".to_string(),
                first_name: "Maria".to_string(),
                last_name: "Quispe".to_string(),
            })
            .unwrap()
    }

    fn seed_loan(store: &MemoryStore, client_id: ClientId) -> (Loan, Vec<Installment>) {
        let terms = LoanTerms {
            principal: Money::from_major(1_000),
            interest_rate: Rate::from_decimal(dec!(0.12)),
            term_count: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        };
        let schedule = AmortizationSchedule::generate(terms).unwrap();
        let loan = Loan {
            id: Uuid::new_v4(),
            client_id,
            created_by: Uuid::new_v4(),
            principal: terms.principal,
            interest_rate: terms.interest_rate,
            term_count: terms.term_count,
            start_date: terms.start_date,
            status: LoanStatus::Active,
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 15, 0, 0).unwrap(),
        };
        let rows: Vec<Installment> = schedule
            .rows
            .iter()
            .map(|r| Installment {
                id: Uuid::new_v4(),
                loan_id: loan.id,
                installment_number: r.installment_number,
                due_date: r.due_date,
                installment_amount: r.installment_amount,
                principal_amount: r.principal_amount,
                interest_amount: r.interest_amount,
                remaining_balance: r.remaining_balance,
                status: InstallmentStatus::Pending,
                paid_at: None,
            })
            .collect();
        let created = store.create_loan(loan, rows.clone()).unwrap();
        (created, rows)
    }

    #[test]
    fn test_create_persists_loan_and_full_schedule() {
        let store = MemoryStore::new();
        let client = seed_client(&store);
        let (loan, _) = seed_loan(&store, client.id);

        assert_eq!(store.get_loan(loan.id).unwrap().status, LoanStatus::Active);
        let rows = store.loan_installments(loan.id).unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].installment_number, 1);
        assert_eq!(rows[11].installment_number, 12);
    }

    #[test]
    fn test_second_open_loan_for_client_rejected() {
        let store = MemoryStore::new();
        let client = seed_client(&store);
        let (first, _) = seed_loan(&store, client.id);

        let again = Loan {
            id: Uuid::new_v4(),
            ..first.clone()
        };
        let err = store.create_loan(again, Vec::new()).unwrap_err();
        assert!(matches!(err, LoanError::ClientHasActiveLoan { loan_id, .. } if loan_id == first.id));
    }

    #[test]
    fn test_create_for_unknown_client_rejected() {
        let store = MemoryStore::new();
        let loan = Loan {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            principal: Money::from_major(1_000),
            interest_rate: Rate::from_decimal(dec!(0.12)),
            term_count: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            status: LoanStatus::Active,
            created_at: Utc::now(),
        };
        assert!(matches!(
            store.create_loan(loan, Vec::new()).unwrap_err(),
            LoanError::ClientNotFound { .. }
        ));
    }

    #[test]
    fn test_toggle_recomputes_loan_status_atomically() {
        let store = MemoryStore::new();
        let client = seed_client(&store);
        let (loan, rows) = seed_loan(&store, client.id);
        let paid_at = Utc.with_ymd_and_hms(2024, 2, 15, 17, 0, 0).unwrap();

        // pay everything but the last installment
        for row in &rows[..11] {
            let outcome = store
                .set_installment_paid(loan.id, row.id, true, Some(paid_at))
                .unwrap();
            assert_eq!(outcome.loan_status, LoanStatus::Active);
        }

        // the final payment flips the loan in the same call
        let outcome = store
            .set_installment_paid(loan.id, rows[11].id, true, Some(paid_at))
            .unwrap();
        assert_eq!(outcome.previous_loan_status, LoanStatus::Active);
        assert_eq!(outcome.loan_status, LoanStatus::Paid);
        assert_eq!(store.get_loan(loan.id).unwrap().status, LoanStatus::Paid);

        // unmarking one reopens the loan
        let outcome = store
            .set_installment_paid(loan.id, rows[5].id, false, None)
            .unwrap();
        assert_eq!(outcome.loan_status, LoanStatus::Active);
        assert_eq!(outcome.installment.paid_at, None);
        assert_eq!(outcome.installment.status, InstallmentStatus::Pending);
    }

    #[test]
    fn test_paid_loan_frees_the_client_for_a_new_one() {
        let store = MemoryStore::new();
        let client = seed_client(&store);
        let (loan, rows) = seed_loan(&store, client.id);
        let paid_at = Utc::now();
        for row in &rows {
            store
                .set_installment_paid(loan.id, row.id, true, Some(paid_at))
                .unwrap();
        }
        // previous loan fully paid, so a new one is allowed
        let (second, _) = seed_loan(&store, client.id);
        assert_ne!(second.id, loan.id);
        assert_eq!(store.client_loans(client.id).unwrap().len(), 2);
    }

    #[test]
    fn test_installment_of_another_loan_is_not_found() {
        let store = MemoryStore::new();
        let client_a = seed_client(&store);
        let (loan_a, rows_a) = seed_loan(&store, client_a.id);
        let client_b = seed_client(&store);
        let (loan_b, _) = seed_loan(&store, client_b.id);

        let err = store
            .set_installment_paid(loan_b.id, rows_a[0].id, true, Some(Utc::now()))
            .unwrap_err();
        assert!(matches!(err, LoanError::InstallmentNotFound { .. }));
        // the row is still payable under its own loan
        assert!(store
            .set_installment_paid(loan_a.id, rows_a[0].id, true, Some(Utc::now()))
            .is_ok());
    }

    #[test]
    fn test_overdue_sweep_marks_and_reaggregates() {
        let store = MemoryStore::new();
        let client = seed_client(&store);
        let (loan, rows) = seed_loan(&store, client.id);

        // first two installments (feb 15, mar 15) are past due on apr 1
        let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let outcomes = store.mark_overdue(today).unwrap();
        assert_eq!(outcomes.len(), 1);
        let outcome = &outcomes[0];
        assert_eq!(outcome.loan_id, loan.id);
        assert_eq!(outcome.marked.len(), 2);
        assert_eq!(outcome.previous_loan_status, LoanStatus::Active);
        assert_eq!(outcome.loan_status, LoanStatus::Overdue);

        let stored = store.loan_installments(loan.id).unwrap();
        assert_eq!(stored[0].status, InstallmentStatus::Overdue);
        assert_eq!(stored[1].status, InstallmentStatus::Overdue);
        assert_eq!(stored[2].status, InstallmentStatus::Pending);

        // a second sweep on the same day finds nothing new
        assert!(store.mark_overdue(today).unwrap().is_empty());

        // paying the overdue rows restores the loan
        let paid_at = Utc::now();
        store
            .set_installment_paid(loan.id, rows[0].id, true, Some(paid_at))
            .unwrap();
        let outcome = store
            .set_installment_paid(loan.id, rows[1].id, true, Some(paid_at))
            .unwrap();
        assert_eq!(outcome.loan_status, LoanStatus::Active);
    }
}
