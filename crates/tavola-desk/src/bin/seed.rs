//! # Demo Shift Seeder
//!
//! Runs one shift end to end: open, sell, cancel an
//! order, count, close. Prints the closing summary.
//!
//! ## Usage
//! ```bash
//! # In-memory store (nothing is written to disk)
//! cargo run -p tavola-desk --bin seed -- --memory
//!
//! # SQLite file
//! cargo run -p tavola-desk --bin seed -- --db ./data/tavola.db
//!
//! # Strict writes and signed adjustments
//! TAVOLA_WRITE_MODE=strict TAVOLA_ADJUSTMENT_POLICY=directed cargo run -p tavola-desk --bin seed
//! ```

use std::env;
use std::path::PathBuf;

use tavola_core::{
    Actor, AdjustmentDirection, Denominations, Money, MovementType, NewMovement, OrderRecord,
    OrderStatus, PaymentMethod, Scope,
};
use tavola_desk::{
    telemetry, AuditRequest, CashDesk, CloseRegister, DeskConfig, OpenRegister, StoreBackend,
};

const DEMO_TENANT: &str = "demo-trattoria";
const DEMO_BRANCH: &str = "centro";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config = DeskConfig::load_or_default(None);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.store.backend = StoreBackend::Sqlite;
                    config.store.path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--memory" | "-m" => {
                config.store.backend = StoreBackend::Memory;
            }
            "--help" | "-h" => {
                println!("Tavola Demo Shift Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    SQLite database file (default: platform data dir)");
                println!("  -m, --memory       Use the in-memory store");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tavola Demo Shift Seeder");
    println!("===========================");
    println!("Store:       {}", config.store.backend);
    println!("Adjustments: {}", config.ledger.adjustment_policy);
    println!("Writes:      {}", config.guard.write_mode);
    println!();

    let desk = CashDesk::from_config(&config).await?;
    println!("✓ Store ready");

    let scope = Scope::new(DEMO_TENANT, DEMO_BRANCH);
    let actor = Actor::new("demo-cashier").with_name("Demo Cashier");

    // -------------------------------------------------------------------------
    // Shift
    // -------------------------------------------------------------------------

    let register = desk
        .registers()
        .open_register(
            &scope,
            &actor,
            OpenRegister::from_input("Main bar", "100.00", Some("Demo shift"))?,
        )
        .await?;
    println!("✓ Opened register {} with {}", register.id, register.initial_balance);

    let orders = desk.order_records();
    for (id, number) in [("ord-101", "#101"), ("ord-102", "#102")] {
        orders
            .upsert(
                &scope,
                &OrderRecord {
                    id: id.to_string(),
                    order_number: Some(number.to_string()),
                    status: OrderStatus::Completed,
                },
            )
            .await?;
    }

    let movements = [
        NewMovement::new(MovementType::Sale, Money::from_cents(5_000), PaymentMethod::Cash, "Table 4")
            .for_order("ord-101", Some("#101".to_string())),
        NewMovement::new(MovementType::Sale, Money::from_cents(3_000), PaymentMethod::Cash, "Table 9")
            .for_order("ord-102", Some("#102".to_string())),
        NewMovement::new(MovementType::Sale, Money::from_cents(4_250), PaymentMethod::Card, "Table 2"),
        NewMovement::new(MovementType::Expense, Money::from_cents(2_000), PaymentMethod::Cash, "Ice delivery"),
        NewMovement::new(MovementType::Adjustment, Money::from_cents(50), PaymentMethod::Cash, "Coin recount")
            .directed(AdjustmentDirection::Increase),
    ];
    for movement in movements {
        let recorded = desk
            .movements()
            .record_movement(&scope, &actor, &register.id, movement)
            .await?;
        println!(
            "  + {:<10} {:>10}  {}",
            format!("{:?}", recorded.movement_type),
            recorded.amount.to_string(),
            recorded.description
        );
    }

    orders.set_status(&scope, "ord-102", OrderStatus::Cancelled).await?;
    println!("✓ Order #102 cancelled");

    let snapshot = desk.summaries().summarize_register(&scope, &register.id).await?;
    let expected = snapshot.summary.expected_balance;

    let counted = Denominations::new()
        .bill(5_000, 2)
        .bill(1_000, 3)
        .coin(100, 3);
    let counted_total = counted.total()?;
    let audit = desk
        .audits()
        .perform_audit(
            &scope,
            &actor,
            &register.id,
            AuditRequest::new(counted_total).with_denominations(counted),
        )
        .await?;
    println!(
        "✓ Audit: expected {}, counted {}, {:?} ({})",
        audit.expected_cash, audit.actual_cash, audit.status, audit.difference
    );

    let closed = desk
        .registers()
        .close_register(
            &scope,
            &actor,
            &register.id,
            CloseRegister::new(expected).with_notes("Demo close"),
        )
        .await?;

    // -------------------------------------------------------------------------
    // Report
    // -------------------------------------------------------------------------

    let summary = &closed.summary;
    println!();
    println!("Closing summary for {}", closed.register.name);
    println!("  Initial balance:  {:>10}", closed.register.initial_balance.to_string());
    println!("  Sales:            {:>10}", summary.total_sales.to_string());
    println!("  Expenses:         {:>10}", summary.total_expense.to_string());
    println!("  Adjustments:      {:>10}", summary.adjustment_effect.to_string());
    println!("  Voided:           {:>10}  ({} movement)", summary.voided_total.to_string(), summary.voided_count);
    for (method, total) in &summary.payment_method_totals {
        println!("  {:<17} {:>10}", format!("{:?}:", method), total.to_string());
    }
    println!("  Expected balance: {:>10}", summary.expected_balance.to_string());
    println!("  Counted balance:  {:>10}", summary.actual_balance.to_string());
    println!(
        "  Difference:       {:>10}",
        summary.difference.unwrap_or_else(Money::zero).to_string()
    );
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
