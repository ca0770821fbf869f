use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ClientId, InstallmentId, LoanId, LoanStatus};

/// all events emitted by engine operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LoanCreated {
        loan_id: LoanId,
        client_id: ClientId,
        principal: Money,
        term_count: u32,
        timestamp: DateTime<Utc>,
    },
    InstallmentPaid {
        loan_id: LoanId,
        installment_id: InstallmentId,
        installment_number: u32,
        amount: Money,
        paid_at: DateTime<Utc>,
    },
    InstallmentReverted {
        loan_id: LoanId,
        installment_id: InstallmentId,
        installment_number: u32,
        timestamp: DateTime<Utc>,
    },
    InstallmentMarkedOverdue {
        loan_id: LoanId,
        installment_id: InstallmentId,
        installment_number: u32,
        due_date: NaiveDate,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },
    LoanStatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_take_drains_the_store() {
        let mut store = EventStore::new();
        store.emit(Event::LoanStatusChanged {
            loan_id: Uuid::new_v4(),
            old_status: LoanStatus::Active,
            new_status: LoanStatus::Paid,
            timestamp: Utc::now(),
        });
        assert_eq!(store.events().len(), 1);

        let taken = store.take_events();
        assert_eq!(taken.len(), 1);
        assert!(store.events().is_empty());
    }
}
