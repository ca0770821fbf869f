pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod policy;
pub mod render;
pub mod schedule;
pub mod status;
pub mod store;
pub mod types;

// re-export key types
pub use config::{BusinessCalendar, EngineConfig, PolicyConfig, StatementOptions};
pub use decimal::{Money, Rate};
pub use engine::{
    ClientPortfolio, CreateLoanRequest, CreatedLoan, LoanDetail, LoanEngine, LoanPreview,
    PaymentUpdate, StatementExport,
};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use policy::LoanCreationPolicy;
pub use render::{ScheduleTableRenderer, StatementData, StatementDocument};
pub use schedule::{AmortizationSchedule, ScheduleRow};
pub use status::{resolve_installment, ResolvedStatus, StatusCounts};
pub use store::{LoanStore, MemoryStore, SweepOutcome, ToggleOutcome};
pub use types::{
    Client, ClientId, Installment, InstallmentId, InstallmentStatus, Loan, LoanId, LoanStatus,
    LoanTerms,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
