/// quick start - preview a schedule, create the loan, inspect the rows
use chrono::{NaiveDate, TimeZone, Utc};
use microloan_rs::{
    CreateLoanRequest, EngineConfig, LoanEngine, LoanTerms, MemoryStore, Money, Rate,
    SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 17, 0, 0).unwrap(),
    ));

    let mut engine = LoanEngine::new(MemoryStore::new(), EngineConfig::default());

    let terms = LoanTerms {
        principal: Money::from_major(1_000),
        interest_rate: Rate::from_decimal(dec!(0.12)),
        term_count: 12,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
    };

    // 1. preview: nothing persisted
    let preview = engine.preview(terms, &time)?;
    println!("=== preview ===");
    println!("  level payment: S/ {}", preview.summary.installment_amount);
    println!("  total interest: S/ {}", preview.summary.total_interest);
    println!("  total to pay: S/ {}", preview.summary.total_amount);
    println!("  last due date: {}", preview.summary.last_due_date);

    // 2. create for a registered client
    let client = engine.register_client("45671234", "Maria", "Quispe")?;
    let created = engine.create_loan(
        CreateLoanRequest {
            client_id: client.id,
            terms,
            declaration_accepted: false,
            created_by: Uuid::new_v4(),
        },
        &time,
    )?;

    println!("\n=== schedule for loan {} ===", created.loan.id);
    println!("  no.  due date    installment  interest  principal    balance");
    for row in &created.installments {
        println!(
            "  {:>3}  {}  {:>11}  {:>8}  {:>9}  {:>9}",
            row.installment_number,
            row.due_date,
            row.installment_amount.to_string(),
            row.interest_amount.to_string(),
            row.principal_amount.to_string(),
            row.remaining_balance.to_string(),
        );
    }

    Ok(())
}
