//! A command line viewer for the remote budget service: fetches one month's
//! budget and prints the sections, items and totals.

use budgetsync::{AppState, clients};
use clap::Parser;
use time::OffsetDateTime;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The base URL of the budget service API.
    #[arg(long, default_value = clients::DEFAULT_BASE_URL)]
    url: String,

    /// The year to fetch. Defaults to the current year.
    #[arg(long)]
    year: Option<i32>,

    /// The month (1-12) to fetch. Defaults to the current month.
    #[arg(long)]
    month: Option<u8>,
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();
    let today = OffsetDateTime::now_utc().date();
    let year = args.year.unwrap_or(today.year());
    let month = args.month.unwrap_or(u8::from(today.month()));

    let state = AppState::new(&args.url);
    state.budgets.fetch_budget(year, month).await;

    let budget = match state.budgets.current_budget() {
        Some(budget) => budget,
        None => {
            eprintln!("no budget available for {year}-{month:02}");
            std::process::exit(1);
        }
    };

    if budget.is_offline {
        let reason = state
            .budgets
            .error()
            .unwrap_or_else(|| "service unreachable".to_string());
        eprintln!("warning: showing offline placeholder ({reason})");
    }

    println!("Budget for {year}-{month:02}");
    for section in &budget.sections {
        println!(
            "  {} ({})",
            section.name,
            if section.is_income { "income" } else { "expenses" }
        );
        for item in &section.items {
            println!(
                "    {:<30} planned {:>10.2}  actual {:>10.2}",
                item.name, item.planned_amount, item.actual_amount
            );
        }
        println!(
            "    {:<30} planned {:>10.2}  actual {:>10.2}",
            "total", section.total_planned, section.total_actual
        );
    }
    println!();
    println!("planned income:   {:>12.2}", budget.total_planned_income);
    println!("actual income:    {:>12.2}", budget.total_income);
    println!("planned expenses: {:>12.2}", budget.total_planned_expenses);
    println!("actual expenses:  {:>12.2}", budget.total_expenses);
}
