pub mod layout;
pub mod pdf;

pub use layout::{
    Align, Page, RuleLine, ScheduleTableRenderer, StatementData, StatementDocument, TextCell,
};
pub use pdf::write_pdf;
