use std::fs::OpenOptions;
use std::path::PathBuf;

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Logs to stderr and appends to `log.txt` next to the executable.
pub fn init() {
    let path = exe_dir().join("log.txt");
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .level_for("wgpu_core", log::LevelFilter::Warn)
        .level_for("wgpu_hal", log::LevelFilter::Warn)
        .chain(std::io::stderr());

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => dispatch = dispatch.chain(file),
        Err(e) => eprintln!("Warning: could not open log file {}: {}", path.display(), e),
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("Logger already initialised: {}", e);
    }
    log::info!("===== Smart Translate start =====");
}
