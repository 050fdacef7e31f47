use mitospace_client::App;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting MitoSpace client (native)...");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("MitoSpace - Mitochondrial Phenotype Explorer"),
        depth_buffer: 24,
        ..Default::default()
    };

    eframe::run_native(
        "MitoSpace",
        native_options,
        Box::new(|cc| Ok(Box::new(App::new(cc)))),
    )
}
