mod app;
mod catalog;
mod history;
mod model;
mod store;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Fab Layout",
        native_options,
        Box::new(|cc| Ok(Box::new(app::LayoutApp::new(cc)))),
    )
}
