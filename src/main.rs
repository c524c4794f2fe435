use std::process::ExitCode;
use std::time::Duration;

mod catalog;
mod columns;
mod controller;
mod debounce;
mod domain;
mod engine;
mod inputter;
mod model;
mod ui;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use controller::Controller;
use domain::{DashConfig, DashError};
use engine::TableEngine;
use model::{Model, Status};
use ui::DashUI;

#[derive(Parser, Debug)]
#[command(version, about = "A tui based admin dashboard for browsing products and orders.")]
struct Cli {
    /// Product catalog file (csv or parquet)
    products: String,

    /// Order list file (csv or parquet)
    orders: String,

    /// Initial product filter, like the dashboard's ?q= parameter
    #[arg(short, long)]
    query: Option<String>,

    /// Rows per table page
    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// Write tracing output here (filtered by RUST_LOG)
    #[arg(long)]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: Cli) -> Result<(), DashError> {
    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }
    info!("Starting shopdash");

    let products = catalog::load_products(&catalog::expand_path(&cli.products)?)?;
    let orders = catalog::load_orders(&catalog::expand_path(&cli.orders)?)?;

    let config = DashConfig::default()
        .page_size(cli.page_size.max(1))
        .query(cli.query);
    let window = Duration::from_millis(config.debounce_ms);

    let mut model = Model::init(
        &config,
        TableEngine::new(products, columns::product_columns(), "name", window),
        TableEngine::new(orders, columns::order_columns(), "product_name", window),
    );

    let ui = DashUI::new();
    let controller = Controller::new(&config);

    let mut terminal = ratatui::init();
    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        if let Some(message) = controller.handle_event(&model)? {
            model.update(message);
        }
        // Apply any typed filter whose quiescence window has elapsed.
        model.tick();
    }

    Ok(())
}

fn init_logging(path: &str) -> Result<(), DashError> {
    let file = std::fs::File::create(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
