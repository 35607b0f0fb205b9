fn main() {
    if let Err(e) = wardbook_lib::run() {
        tracing::error!(error = %e, "Startup failed");
        eprintln!("wardbook: {e}");
        std::process::exit(1);
    }
}
