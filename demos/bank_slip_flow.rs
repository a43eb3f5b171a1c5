//! End-to-end walk through the back office against the in-memory platform
//!
//! Run with `RUST_LOG=debug` to see every platform call.

use bigdecimal::BigDecimal;
use bursar_core::utils::money::format_brl;
use bursar_core::{
    BankSlipDesk, BatchForm, BulkImporter, DirectoryUser, ImportKind, MemoryPlatform,
    ScholarshipDefaults, SlipFilter,
};
use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

const STUDENTS: &str = "\
student_id,tax_id,billing_city,billing_state
3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f,123.456.789-00,São Paulo,SP
9a1c7e55-2b3d-4f60-a1b2-c3d4e5f60718,987.654.321-00,Campinas,SP
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let platform = MemoryPlatform::new();
    for (id, name) in [
        ("3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f", "Ana Souza"),
        ("9a1c7e55-2b3d-4f60-a1b2-c3d4e5f60718", "Bruno Lima"),
    ] {
        platform.add_user(DirectoryUser {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@school.example", name.split(' ').next().unwrap_or("aluno").to_lowercase()),
            role: "student".to_string(),
        });
    }

    println!("== Importing student financial data");
    let mut importer = BulkImporter::new(platform.clone());
    importer
        .import_csv(ImportKind::StudentFinancial, STUDENTS, &ScholarshipDefaults::default())
        .await?;
    if let Some(view) = importer.view() {
        print!("{}", view.render());
    }

    println!("\n== Generating the March batch");
    let desk = BankSlipDesk::new(platform.clone());
    let recipients: Vec<String> = desk
        .eligible_recipients()
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();
    let batch = desk
        .generate_from_form(BatchForm {
            selected_students: recipients,
            amount: "850,00".to_string(),
            due_date: "2025-03-10".to_string(),
            description: "Mensalidade março".to_string(),
        })
        .await?;
    desk.send_batch(&batch, "monthly_tuition").await?;
    println!("batch {}", batch);

    println!("\n== Forty days later");
    let today = NaiveDate::from_ymd_opt(2025, 4, 19).ok_or("bad date")?;
    platform.set_today(today);
    let slips = desk.list(&SlipFilter::default()).await?;
    for slip in &slips {
        let due = desk.amount_due(slip, today).await?;
        println!("{}  {}  {}", slip.student_id, slip.status.label(), format_brl(&due));
    }

    if let Some(slip) = slips.first() {
        let form = desk.prepare_payment(&slip.id, today).await?;
        println!("\n== Settling {} for {}", slip.id, format_brl(&form.payment_amount));
        let receipt = desk.pay(&slip.id, Some(form.payment_amount.clone()), None).await?;
        println!("{}", receipt.outcome.message);

        match desk.pay(&slip.id, Some(BigDecimal::from(1)), None).await {
            Ok(_) => println!("unexpected second settlement"),
            Err(e) => println!("second attempt refused: {}", e),
        }
    }

    Ok(())
}
