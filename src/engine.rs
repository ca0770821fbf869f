use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::events::{Event, EventStore};
use crate::policy::LoanCreationPolicy;
use crate::render::{write_pdf, ScheduleTableRenderer, StatementData};
use crate::schedule::{AmortizationSchedule, ScheduleRow};
use crate::status::{resolve_installment, ResolvedStatus};
use crate::store::{LoanStore, SweepOutcome, ToggleOutcome};
use crate::types::{
    ActorId, Client, ClientId, Installment, InstallmentId, InstallmentStatus, Loan, LoanId,
    LoanStatus, LoanTerms,
};

/// preview of a schedule, nothing persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPreview {
    pub summary: PreviewSummary,
    pub schedule: Vec<ScheduleRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_count: u32,
    pub start_date: chrono::NaiveDate,
    /// the level payment carried by every installment but possibly the last
    pub installment_amount: Money,
    pub total_interest: Money,
    pub total_amount: Money,
    pub last_due_date: chrono::NaiveDate,
}

/// creation request as it arrives from the request layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    pub client_id: ClientId,
    pub terms: LoanTerms,
    #[serde(default)]
    pub declaration_accepted: bool,
    pub created_by: ActorId,
}

/// a created loan with its persisted schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedLoan {
    pub loan: Loan,
    pub installments: Vec<Installment>,
}

/// paid/unpaid toggle payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub paid: bool,
    /// defaults to the injected now when marking paid
    pub paid_at: Option<DateTime<Utc>>,
}

/// one installment annotated with its read-time classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentView {
    #[serde(flatten)]
    pub installment: Installment,
    pub computed_status: InstallmentStatus,
    pub days_overdue: u32,
}

/// loan detail: the loan, its owner, and the annotated schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetail {
    pub loan: Loan,
    pub client: Client,
    pub installments: Vec<InstallmentView>,
}

/// per-loan derived totals for a client's portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanAccountSummary {
    pub loan: Loan,
    pub paid_amount: Money,
    /// interest already collected through paid installments
    pub realized_interest: Money,
    /// interest the full schedule will yield
    pub expected_interest: Money,
    /// total still owed across unpaid installments
    pub debt: Money,
    pub remaining_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPortfolio {
    pub client: Client,
    pub loans: Vec<LoanAccountSummary>,
}

/// rendered statement ready to stream
#[derive(Debug, Clone, PartialEq)]
pub struct StatementExport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// the lifecycle engine: policy, generator, resolver, aggregator and
/// renderer wired over a store
///
/// Time is injected per call; the engine never reads a process-global
/// clock. Mutating operations record events in the engine's event store.
pub struct LoanEngine<S: LoanStore> {
    store: S,
    config: EngineConfig,
    policy: LoanCreationPolicy,
    renderer: ScheduleTableRenderer,
    events: EventStore,
}

impl<S: LoanStore> LoanEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        let policy = LoanCreationPolicy::new(config.policy.clone());
        let renderer = ScheduleTableRenderer::new(config.statement.clone());
        Self {
            store,
            config,
            policy,
            renderer,
            events: EventStore::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// register a client so loans can be attached to them
    pub fn register_client(
        &mut self,
        national_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Client> {
        self.store.insert_client(Client {
            id: Uuid::new_v4(),
            national_id: national_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        })
    }

    /// compute a schedule preview without persisting anything
    pub fn preview(&self, terms: LoanTerms, time: &SafeTimeProvider) -> Result<LoanPreview> {
        let today = self.config.calendar.today(time);
        self.policy.validate_terms(&terms, today)?;

        let schedule = AmortizationSchedule::generate(terms)?;
        Ok(LoanPreview {
            summary: PreviewSummary {
                principal: terms.principal,
                interest_rate: terms.interest_rate,
                term_count: terms.term_count,
                start_date: terms.start_date,
                installment_amount: schedule.level_payment,
                total_interest: schedule.total_interest,
                total_amount: schedule.total_amount,
                last_due_date: schedule.last_due_date(),
            },
            schedule: schedule.rows,
        })
    }

    /// validate, generate and persist a loan with its full schedule
    pub fn create_loan(
        &mut self,
        request: CreateLoanRequest,
        time: &SafeTimeProvider,
    ) -> Result<CreatedLoan> {
        let today = self.config.calendar.today(time);
        self.policy
            .validate_creation(&request.terms, request.declaration_accepted, today)?;

        let schedule = AmortizationSchedule::generate(request.terms)?;
        let now = time.now();
        let loan = Loan {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            created_by: request.created_by,
            principal: request.terms.principal,
            interest_rate: request.terms.interest_rate,
            term_count: request.terms.term_count,
            start_date: request.terms.start_date,
            status: LoanStatus::Active,
            created_at: now,
        };
        let installments: Vec<Installment> = schedule
            .rows
            .iter()
            .map(|row| Installment {
                id: Uuid::new_v4(),
                loan_id: loan.id,
                installment_number: row.installment_number,
                due_date: row.due_date,
                installment_amount: row.installment_amount,
                principal_amount: row.principal_amount,
                interest_amount: row.interest_amount,
                remaining_balance: row.remaining_balance,
                status: InstallmentStatus::Pending,
                paid_at: None,
            })
            .collect();

        // client existence and the single-active-loan rule are enforced
        // inside this call, atomically with the insert
        let loan = self.store.create_loan(loan, installments)?;
        let installments = self.store.loan_installments(loan.id)?;

        info!(
            "created loan {} for client {}: {} over {} months",
            loan.id, loan.client_id, loan.principal, loan.term_count
        );
        self.events.emit(Event::LoanCreated {
            loan_id: loan.id,
            client_id: loan.client_id,
            principal: loan.principal,
            term_count: loan.term_count,
            timestamp: now,
        });

        Ok(CreatedLoan { loan, installments })
    }

    /// mark an installment paid or revert it, re-aggregating the loan
    /// status in the same atomic store call
    pub fn toggle_installment(
        &mut self,
        loan_id: LoanId,
        installment_id: InstallmentId,
        update: PaymentUpdate,
        time: &SafeTimeProvider,
    ) -> Result<ToggleOutcome> {
        let now = time.now();
        let paid_at = if update.paid {
            Some(update.paid_at.unwrap_or(now))
        } else {
            None
        };

        let outcome = self
            .store
            .set_installment_paid(loan_id, installment_id, update.paid, paid_at)?;

        debug!(
            "installment {} of loan {} toggled to {:?}",
            outcome.installment.installment_number, loan_id, outcome.installment.status
        );
        if update.paid {
            self.events.emit(Event::InstallmentPaid {
                loan_id,
                installment_id,
                installment_number: outcome.installment.installment_number,
                amount: outcome.installment.installment_amount,
                paid_at: paid_at.unwrap_or(now),
            });
        } else {
            self.events.emit(Event::InstallmentReverted {
                loan_id,
                installment_id,
                installment_number: outcome.installment.installment_number,
                timestamp: now,
            });
        }
        if outcome.loan_status != outcome.previous_loan_status {
            info!(
                "loan {} status {:?} -> {:?}",
                loan_id, outcome.previous_loan_status, outcome.loan_status
            );
            self.events.emit(Event::LoanStatusChanged {
                loan_id,
                old_status: outcome.previous_loan_status,
                new_status: outcome.loan_status,
                timestamp: now,
            });
        }

        Ok(outcome)
    }

    /// loan, owner and schedule, annotated against the injected now
    pub fn loan_detail(&self, loan_id: LoanId, time: &SafeTimeProvider) -> Result<LoanDetail> {
        let loan = self.store.get_loan(loan_id)?;
        let client = self.store.get_client(loan.client_id)?;
        let today = self.config.calendar.today(time);

        let installments = self
            .store
            .loan_installments(loan_id)?
            .into_iter()
            .map(|installment| {
                let ResolvedStatus {
                    computed_status,
                    days_overdue,
                } = resolve_installment(&installment, today, &self.config.calendar);
                InstallmentView {
                    installment,
                    computed_status,
                    days_overdue,
                }
            })
            .collect();

        Ok(LoanDetail {
            loan,
            client,
            installments,
        })
    }

    /// a client's loans with derived repayment totals
    pub fn client_portfolio(&self, client_id: ClientId) -> Result<ClientPortfolio> {
        let client = self.store.get_client(client_id)?;
        let mut summaries = Vec::new();

        for loan in self.store.client_loans(client_id)? {
            let installments = self.store.loan_installments(loan.id)?;
            let total_amount: Money = installments.iter().map(|i| i.installment_amount).sum();
            let expected_interest: Money = installments.iter().map(|i| i.interest_amount).sum();
            let paid: Vec<&Installment> = installments
                .iter()
                .filter(|i| i.status == InstallmentStatus::Paid)
                .collect();
            let paid_amount: Money = paid.iter().map(|i| i.installment_amount).sum();
            let realized_interest: Money = paid.iter().map(|i| i.interest_amount).sum();
            let remaining_count = (installments.len() - paid.len()) as u32;

            summaries.push(LoanAccountSummary {
                loan,
                paid_amount,
                realized_interest,
                expected_interest,
                debt: total_amount - paid_amount,
                remaining_count,
            });
        }

        Ok(ClientPortfolio {
            client,
            loans: summaries,
        })
    }

    /// persist the overdue classification for every due-and-unpaid
    /// installment, re-aggregating each touched loan
    pub fn run_overdue_sweep(&mut self, time: &SafeTimeProvider) -> Result<Vec<SweepOutcome>> {
        let today = self.config.calendar.today(time);
        let now = time.now();
        let outcomes = self.store.mark_overdue(today)?;

        for outcome in &outcomes {
            for installment in &outcome.marked {
                let days_overdue = self
                    .config
                    .calendar
                    .days_between(installment.due_date, today)
                    .max(0) as u32;
                self.events.emit(Event::InstallmentMarkedOverdue {
                    loan_id: outcome.loan_id,
                    installment_id: installment.id,
                    installment_number: installment.installment_number,
                    due_date: installment.due_date,
                    days_overdue,
                    timestamp: now,
                });
            }
            if outcome.loan_status != outcome.previous_loan_status {
                self.events.emit(Event::LoanStatusChanged {
                    loan_id: outcome.loan_id,
                    old_status: outcome.previous_loan_status,
                    new_status: outcome.loan_status,
                    timestamp: now,
                });
            }
        }
        if !outcomes.is_empty() {
            info!(
                "overdue sweep touched {} loan(s) as of {}",
                outcomes.len(),
                today
            );
        }

        Ok(outcomes)
    }

    /// render the loan's schedule statement as a PDF stream
    pub fn export_statement(&self, loan_id: LoanId) -> Result<StatementExport> {
        let loan = self.store.get_loan(loan_id)?;
        let client = self.store.get_client(loan.client_id)?;
        let installments = self.store.loan_installments(loan_id)?;

        let document = self.renderer.render(&StatementData {
            client,
            loan,
            installments,
        });
        Ok(StatementExport {
            bytes: write_pdf(&document),
            content_type: "application/pdf",
            filename: format!("schedule_loan_{}.pdf", loan_id),
        })
    }
}
