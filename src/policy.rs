use chrono::NaiveDate;

use crate::config::PolicyConfig;
use crate::errors::{LoanError, Result};
use crate::types::LoanTerms;

/// creation gate: ordered checks, first failure wins
///
/// The term checks below are pure. The remaining two rules of the gate,
/// client existence and the single-active-loan rule, need committed state
/// and are evaluated by the store inside the creation transaction, after
/// these pass (see `LoanStore::create_loan`).
#[derive(Debug, Clone, Default)]
pub struct LoanCreationPolicy {
    config: PolicyConfig,
}

impl LoanCreationPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// amount, rate, term and date rules; used by preview and create alike
    pub fn validate_terms(&self, terms: &LoanTerms, today: NaiveDate) -> Result<()> {
        if terms.principal < self.config.min_principal {
            return Err(LoanError::PrincipalBelowMinimum {
                principal: terms.principal,
                minimum: self.config.min_principal,
            });
        }
        if terms.principal > self.config.max_principal {
            return Err(LoanError::PrincipalAboveMaximum {
                principal: terms.principal,
                maximum: self.config.max_principal,
            });
        }
        if terms.interest_rate < self.config.rate_floor {
            return Err(LoanError::RateBelowFloor {
                rate: terms.interest_rate,
                floor: self.config.rate_floor,
            });
        }
        if terms.term_count < self.config.min_term || terms.term_count > self.config.max_term {
            return Err(LoanError::TermOutOfBounds {
                term_count: terms.term_count,
                minimum: self.config.min_term,
                maximum: self.config.max_term,
            });
        }
        if terms.start_date < today {
            return Err(LoanError::StartDateInPast {
                start_date: terms.start_date,
                today,
            });
        }
        Ok(())
    }

    /// full creation gate: term rules plus the declaration threshold
    pub fn validate_creation(
        &self,
        terms: &LoanTerms,
        declaration_accepted: bool,
        today: NaiveDate,
    ) -> Result<()> {
        self.validate_terms(terms, today)?;

        if terms.principal >= self.config.declaration_threshold && !declaration_accepted {
            return Err(LoanError::DeclarationRequired {
                principal: terms.principal,
                threshold: self.config.declaration_threshold,
            });
        }
        Ok(())
    }
}
