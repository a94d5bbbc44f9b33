fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    properties_panel::run_app()
}
