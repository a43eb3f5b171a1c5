//! Integration tests for bursar-core

use bigdecimal::BigDecimal;
use bursar_core::{
    reconcile, BankSlip, BankSlipDesk, BankSlipStatus, BatchGenerator, BatchRequest,
    BulkImporter, FeeCalculator, FinanceError, FinancialPlatform, ImportBatch, ImportKind,
    MemoryPlatform, PaymentProcessor, ReportRequest, ScholarshipDefaults, SlipFilter,
};
use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_scholarship_csv_with_defaults_and_missing_id() {
    let platform = MemoryPlatform::new();
    let mut importer = BulkImporter::new(platform.clone());
    let defaults = ScholarshipDefaults {
        scholarship_id: None,
        start_date: Some(date(2025, 2, 1)),
        end_date: Some(date(2025, 12, 31)),
    };

    let batch = ImportBatch::parse(
        ImportKind::Scholarship,
        "student_id,discount_percentage\nabc123,50\n",
        &defaults,
    )
    .unwrap();
    match &batch {
        ImportBatch::Scholarship(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].student_id, "abc123");
            assert_eq!(rows[0].discount_percentage, BigDecimal::from(50));
            assert_eq!(rows[0].start_date, date(2025, 2, 1));
        }
        other => panic!("unexpected batch: {:?}", other),
    }

    let results = importer.submit(&batch).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].error_message.as_deref(),
        Some("scholarship_id is required")
    );
}

#[tokio::test]
async fn test_invalid_recipient_blocks_generation() {
    let platform = MemoryPlatform::new();
    let desk = BankSlipDesk::new(platform.clone());

    let err = desk
        .generate(&BatchRequest {
            recipient_ids: vec!["not-a-uuid".to_string()],
            amount: BigDecimal::from(100),
            due_date: date(2025, 1, 1),
            description: None,
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not-a-uuid"));
    assert!(err.is_client_side());
    assert_eq!(platform.call_count("generate_bank_slips_batch"), 0);
}

#[tokio::test]
async fn test_partial_bulk_failure_rendered_per_row() {
    let platform = MemoryPlatform::new();
    platform.reject_student("s2", "studentId not found");
    let mut importer = BulkImporter::new(platform.clone());

    let csv = "student_id,tax_id,billing_city\ns1,111,Recife\ns2,222,Natal\ns3,333,Olinda\n";
    importer
        .import_csv(ImportKind::StudentFinancial, csv, &ScholarshipDefaults::default())
        .await
        .unwrap();

    let view = importer.view().unwrap();
    assert_eq!(view.len(), 3);
    assert_eq!(view.succeeded, 2);
    assert_eq!(view.failed, 1);
    let failed: Vec<_> = view.lines.iter().filter(|l| !l.ok).collect();
    assert_eq!(failed[0].label, "Student: s2");
    assert_eq!(failed[0].error_message.as_deref(), Some("studentId not found"));
    assert_eq!(platform.call_count("bulk_register_student_financial_data"), 1);
}

#[tokio::test]
async fn test_payment_keeps_accrued_final_amount() {
    let platform = MemoryPlatform::new();
    let mut slip = BankSlip::new(
        "slip-d".to_string(),
        "student-d".to_string(),
        BigDecimal::from(100),
        date(2025, 1, 10),
        None,
    );
    slip.status = BankSlipStatus::Overdue;
    slip.late_fee = BigDecimal::from(10);
    slip.final_amount = BigDecimal::from(110);
    platform.insert_slip(slip);

    let processor = PaymentProcessor::new(platform.clone());
    let paid_at = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();
    let receipt = processor
        .process("slip-d", &BigDecimal::from(110), Some(paid_at))
        .await
        .unwrap();

    let settled = receipt.slip.unwrap();
    assert_eq!(settled.status, BankSlipStatus::Paid);
    assert_eq!(settled.payment_date, Some(paid_at));
    assert_eq!(settled.final_amount, BigDecimal::from(110));

    // Later days do not raise what a paid slip is worth
    platform.set_today(date(2025, 6, 1));
    let fees = FeeCalculator::new(platform.clone());
    assert_eq!(
        fees.amount_due(&settled, date(2025, 6, 1)).await.unwrap(),
        BigDecimal::from(110)
    );
    assert_eq!(platform.call_count("calculate_late_fees"), 0);
}

#[tokio::test]
async fn test_payment_date_defaults_to_call_time() {
    let platform = MemoryPlatform::new();
    platform.insert_slip(BankSlip::new(
        "slip-now".to_string(),
        "student".to_string(),
        BigDecimal::from(80),
        date(2030, 1, 1),
        None,
    ));

    let before = Utc::now();
    let receipt = PaymentProcessor::new(platform.clone())
        .process("slip-now", &BigDecimal::from(80), None)
        .await
        .unwrap();
    let recorded = receipt.slip.unwrap().payment_date.unwrap();

    assert_eq!(recorded, receipt.payment_date);
    assert!(recorded >= before && recorded <= Utc::now());
}

#[tokio::test]
async fn test_whole_batch_failure_is_distinct_from_row_errors() {
    let platform = MemoryPlatform::new();
    let mut importer = BulkImporter::new(platform.clone());
    platform.fail_next_call("service unavailable");

    let err = importer
        .import_csv(
            ImportKind::StudentFinancial,
            "student_id\na\n",
            &ScholarshipDefaults::default(),
        )
        .await
        .unwrap_err();

    match err {
        FinanceError::Remote { operation, reason } => {
            assert_eq!(operation, "bulk_register_student_financial_data");
            assert_eq!(reason, "service unavailable");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(importer.view().is_none());
}

#[tokio::test]
async fn test_generate_send_list_workflow() {
    let platform = MemoryPlatform::new();
    let desk = BankSlipDesk::new(platform.clone());
    let ids = vec![
        "3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f".to_string(),
        "9a1c7e55-2b3d-4f60-a1b2-c3d4e5f60718".to_string(),
    ];

    let march = desk
        .generate(&BatchRequest {
            recipient_ids: ids.clone(),
            amount: BigDecimal::from(500),
            due_date: date(2025, 3, 10),
            description: Some("March".to_string()),
        })
        .await
        .unwrap();
    desk.generate(&BatchRequest {
        recipient_ids: ids[..1].to_vec(),
        amount: BigDecimal::from(500),
        due_date: date(2025, 4, 10),
        description: None,
    })
    .await
    .unwrap();
    desk.send_batch(&march, "monthly").await.unwrap();

    let all = desk.list(&SlipFilter::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].due_date, date(2025, 4, 10));

    let march_only = desk
        .list(&SlipFilter::default().due_between(Some(date(2025, 3, 1)), Some(date(2025, 3, 31))))
        .await
        .unwrap();
    assert_eq!(march_only.len(), 2);
    assert!(march_only.iter().all(|s| s.email_sent));
}

#[tokio::test]
async fn test_report_rows_pass_through() {
    let platform = MemoryPlatform::new();
    platform.set_report_rows(
        ReportRequest::Dashboard.rpc_name(),
        vec![serde_json::json!({ "total_pending": "1500.00" })],
    );

    let rows = platform.run_report(&ReportRequest::Dashboard).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["total_pending"], "1500.00");
}

proptest! {
    #[test]
    fn prop_any_bad_id_blocks_generation(
        good in proptest::collection::vec(Just(()), 0..6),
        bad in "[a-z0-9-]{1,20}",
        position in 0usize..6,
    ) {
        let platform = MemoryPlatform::new();
        let generator = BatchGenerator::new(platform.clone());
        let mut ids: Vec<String> = good.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect();
        ids.insert(position.min(ids.len()), bad.clone());

        let result = runtime().block_on(generator.generate(&BatchRequest {
            recipient_ids: ids,
            amount: BigDecimal::from(100),
            due_date: date(2025, 1, 1),
            description: None,
        }));

        prop_assert!(matches!(result, Err(FinanceError::InvalidRecipients(_))));
        prop_assert_eq!(platform.call_count("generate_bank_slips_batch"), 0);
    }

    #[test]
    fn prop_fees_never_decrease_after_due_date(
        cents in 1i64..10_000_000,
        d1 in 1i64..400,
        extra in 0i64..400,
    ) {
        let due = date(2025, 1, 10);
        let amount = BigDecimal::new(cents.into(), 2);
        let platform = MemoryPlatform::new();
        let fees = FeeCalculator::new(platform.clone());
        let rt = runtime();

        let first = due + chrono::Duration::days(d1);
        let later = first + chrono::Duration::days(extra);
        platform.set_today(first);
        let at_first = rt.block_on(fees.assess(&amount, due, first)).unwrap();
        platform.set_today(later);
        let at_later = rt.block_on(fees.assess(&amount, due, later)).unwrap();
        prop_assert!(at_later.total_amount >= at_first.total_amount);

        let on_time = rt.block_on(fees.assess(&amount, due, due - chrono::Duration::days(d1))).unwrap();
        prop_assert_eq!(on_time.late_fee, BigDecimal::from(0));
        prop_assert_eq!(on_time.interest, BigDecimal::from(0));
        prop_assert_eq!(on_time.total_amount, amount);
    }

    #[test]
    fn prop_every_row_gets_one_result(ids in proptest::collection::hash_set("[a-z]{1,8}", 1..20)) {
        let ids: Vec<String> = ids.into_iter().collect();
        let csv = std::iter::once("student_id".to_string())
            .chain(ids.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n");
        let platform = MemoryPlatform::new();
        let mut importer = BulkImporter::new(platform);
        let batch = ImportBatch::parse(ImportKind::StudentFinancial, &csv, &ScholarshipDefaults::default()).unwrap();

        let results = runtime().block_on(importer.submit(&batch)).unwrap().to_vec();
        prop_assert_eq!(results.len(), ids.len());
        let rec = reconcile(&batch, &results);
        prop_assert!(rec.is_complete());
        prop_assert_eq!(importer.view().unwrap().len(), ids.len());
    }
}
