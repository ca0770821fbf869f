/// payment lifecycle - from creation through overdue to settlement
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use microloan_rs::{
    CreateLoanRequest, EngineConfig, LoanEngine, LoanStatus, LoanTerms, MemoryStore, Money,
    PaymentUpdate, Rate, SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 10, 17, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut engine = LoanEngine::new(MemoryStore::new(), EngineConfig::default());
    let client = engine.register_client("45671234", "Maria", "Quispe")?;

    // short 6-month loan for easier demonstration
    let created = engine.create_loan(
        CreateLoanRequest {
            client_id: client.id,
            terms: LoanTerms {
                principal: Money::from_major(1_000),
                interest_rate: Rate::from_decimal(dec!(0.12)),
                term_count: 6,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            },
            declaration_accepted: false,
            created_by: Uuid::new_v4(),
        },
        &time,
    )?;
    println!("1. created loan {} ({:?})", created.loan.id, created.loan.status);

    // 2. pay the first two installments on time
    for row in &created.installments[..2] {
        let outcome = engine.toggle_installment(
            created.loan.id,
            row.id,
            PaymentUpdate { paid: true, paid_at: None },
            &time,
        )?;
        println!(
            "2. installment {} paid, loan {:?}",
            row.installment_number, outcome.loan_status
        );
    }

    // 3. let the third installment lapse and run the sweep
    controller.advance(Duration::days(100));
    let outcomes = engine.run_overdue_sweep(&time)?;
    println!(
        "3. sweep on {} marked {} installment(s), loan {:?}",
        time.now().format("%Y-%m-%d"),
        outcomes[0].marked.len(),
        outcomes[0].loan_status
    );
    assert_eq!(outcomes[0].loan_status, LoanStatus::Overdue);

    // 4. the late payment recovers the loan
    let overdue_row = &outcomes[0].marked[0];
    let outcome = engine.toggle_installment(
        created.loan.id,
        overdue_row.id,
        PaymentUpdate { paid: true, paid_at: None },
        &time,
    )?;
    println!("4. overdue installment paid late, loan {:?}", outcome.loan_status);

    // 5. settle the remainder; the last toggle flips the loan to paid
    let detail = engine.loan_detail(created.loan.id, &time)?;
    for view in detail
        .installments
        .iter()
        .filter(|v| v.installment.paid_at.is_none())
    {
        let outcome = engine.toggle_installment(
            created.loan.id,
            view.installment.id,
            PaymentUpdate { paid: true, paid_at: None },
            &time,
        )?;
        println!(
            "5. installment {} paid, loan {:?}",
            view.installment.installment_number, outcome.loan_status
        );
    }

    let final_detail = engine.loan_detail(created.loan.id, &time)?;
    assert_eq!(final_detail.loan.status, LoanStatus::Paid);
    println!("final status: {:?}", final_detail.loan.status);

    println!("\nevents recorded: {}", engine.take_events().len());
    Ok(())
}
