mod app;
use spaced_review_app::*;

use app::MyApp;
use chrono::Local;
use config::{Backend, Settings};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "failed to load settings");
            std::process::exit(1);
        }
    };

    let store = match database::open_store(&settings) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, backend = ?settings.backend, "failed to open question store");
            std::process::exit(1);
        }
    };
    let mut service = ReviewService::new(store);

    let samples = [
        (
            "[RUST] What does the borrow checker enforce?",
            "One mutable reference or any number of shared references, never both at once.",
        ),
        (
            "[SQL] What is the difference between WHERE and HAVING?",
            "WHERE filters rows before grouping, HAVING filters groups after aggregation.",
        ),
    ];
    if settings.backend == Backend::Sqlite {
        if let Err(e) = service.seed_if_empty(&samples, Local::now().date_naive()) {
            warn!(error = %e, "could not create sample questions");
        }
    }

    match service.all_questions() {
        Ok(questions) => info!(questions = questions.len(), "loaded questions"),
        Err(e) => warn!(error = %e, "could not read questions at startup"),
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([640.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Spaced Repetition Learning",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(service, settings.dashboard)))),
    )
}
