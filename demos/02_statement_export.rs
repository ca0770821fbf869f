/// statement export - render the paginated schedule statement to a pdf file
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
    let client = engine.register_client("45671234", "Maria", "Quispe")?;

    // a 60-month term paginates onto a second page
    let created = engine.create_loan(
        CreateLoanRequest {
            client_id: client.id,
            terms: LoanTerms {
                principal: Money::from_major(50_000),
                interest_rate: Rate::from_decimal(dec!(0.15)),
                term_count: 60,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            },
            declaration_accepted: true,
            created_by: Uuid::new_v4(),
        },
        &time,
    )?;

    let export = engine.export_statement(created.loan.id)?;
    println!("content type: {}", export.content_type);
    println!("filename: {}", export.filename);
    println!("bytes: {}", export.bytes.len());

    std::fs::write(&export.filename, &export.bytes)?;
    println!("written to ./{}", export.filename);

    Ok(())
}
