//! Subscriber installation for host binaries.
//!
//! Console output goes to a non-blocking stderr writer; records may also be
//! written as JSON to size-rotated files, routed by target prefix.

use crate::config::{LoggingConfig, Section};
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;

// The non-blocking console writer stops when its guard is dropped.
static CONSOLE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// `None` means the sink is switched off for that target.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" | "verbose" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" | "none" => None,
        _ => Some(LevelFilter::INFO),
    }
}

fn level_or_off(s: &str) -> LevelFilter {
    parse_level(s).unwrap_or(LevelFilter::OFF)
}

// An unset file level means INFO.
fn file_level(section: &Section) -> LevelFilter {
    if section.file_level.trim().is_empty() {
        LevelFilter::INFO
    } else {
        level_or_off(&section.file_level)
    }
}

/// `target` equals `prefix` or lives in a `prefix::` submodule.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

// ---------------------------------------------------------------------------
// Rotating file sinks
// ---------------------------------------------------------------------------

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

struct FileSink(SharedRotate);

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut file) => file.write(buf),
            // A writer that panicked mid-record; drop the record.
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

/// Sends each record to the file of the longest matching target prefix,
/// or to the default file, or nowhere.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<SharedRotate>,
    by_prefix: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<SharedRotate> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

struct RoutedWriter(Option<FileSink>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone().map(FileSink))
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.resolve(meta.target()).map(FileSink))
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(section: &Section, base_dir: &Path) -> std::io::Result<SharedRotate> {
    let path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Keep a fixed number of backups when configured, else prune by age.
    let limit = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            i64::from(section.max_age_days.unwrap_or(1)),
        )),
    };
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) as usize * 1024 * 1024;

    let rotate = FileRotate::new(
        &path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );
    Ok(Arc::new(Mutex::new(rotate)))
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

struct Plan {
    console: Targets,
    file: Targets,
    router: FileRouter,
}

fn plan(cfg: &LoggingConfig, base_dir: &Path) -> Plan {
    let mut router = FileRouter::default();
    let default = cfg.get(DEFAULT_SECTION);

    let open = |name: &str, section: &Section| -> Option<SharedRotate> {
        if section.file.trim().is_empty() {
            return None;
        }
        match open_rotating(section, base_dir) {
            Ok(w) => Some(w),
            Err(e) => {
                // No subscriber yet, so stderr is the only channel.
                eprintln!("Failed to open log file for '{name}': {} ({e})", section.file);
                None
            }
        }
    };

    if let Some(section) = default {
        router.default = open(DEFAULT_SECTION, section);
    }

    let console_default = default
        .map(|s| level_or_off(&s.console_level))
        .unwrap_or(LevelFilter::INFO);
    let file_default = match default {
        Some(s) if router.default.is_some() => file_level(s),
        _ => LevelFilter::OFF,
    };

    let mut console = Targets::new().with_default(console_default);
    let mut file = Targets::new().with_default(file_default);

    let mut sections: Vec<(&String, &Section)> = cfg
        .iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .collect();
    sections.sort_by(|a, b| a.0.cmp(b.0));

    for (name, section) in sections {
        console = console.with_target(name.clone(), level_or_off(&section.console_level));
        if let Some(writer) = open(name, section) {
            router.by_prefix.push((name.clone(), writer));
            file = file.with_target(name.clone(), file_level(section));
        }
    }

    Plan {
        console,
        file,
        router,
    }
}

// ---------------------------------------------------------------------------
// Installation
// ---------------------------------------------------------------------------

/// Install the global subscriber. Relative log files resolve against
/// `base_dir`. `RUST_LOG`, when set, caps every sink.
///
/// Calling it again is a no-op: the first subscriber stays installed.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` records before the subscriber goes in.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    if cfg.is_empty() {
        init_minimal();
        return;
    }

    let Plan {
        console,
        file,
        router,
    } = plan(cfg, base_dir);

    let env = EnvFilter::try_from_default_env().ok();

    let (stderr, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(guard);

    let console_layer = fmt::layer()
        .with_writer(stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console);

    let file_layer = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file)
    });

    let _ = Registry::default()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Console only: `RUST_LOG` when set, INFO otherwise.
pub fn init_minimal() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(filter);

    let _ = Registry::default().with(fmt_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.to_string(),
            file: file.to_string(),
            file_level: file_level.to_string(),
            max_age_days: None,
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("Debug"), Some(LevelFilter::DEBUG));
        assert_eq!(parse_level("verbose"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("warning"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("off"), None);
        assert_eq!(parse_level("bogus"), Some(LevelFilter::INFO));
    }

    #[test]
    fn prefix_matching_respects_module_boundaries() {
        assert!(matches_prefix("evm_network", "evm_network"));
        assert!(matches_prefix("evm_network::module", "evm_network"));
        assert!(!matches_prefix("evm_network_extra", "evm_network"));
        assert!(!matches_prefix("chainkit", "evm_network"));
    }

    #[test]
    fn router_prefers_longest_prefix_then_default() {
        let tmp = tempdir().unwrap();
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("info", "logs/all.log", "debug"));
        cfg.insert("chainkit".into(), section("debug", "logs/kernel.log", ""));
        cfg.insert(
            "chainkit::event_bus".into(),
            section("trace", "logs/bus.log", "trace"),
        );

        let plan = plan(&cfg, tmp.path());

        let bus = plan.router.resolve("chainkit::event_bus").unwrap();
        let kernel = plan.router.resolve("chainkit::coordinator").unwrap();
        let other = plan.router.resolve("backend_server").unwrap();

        assert!(!Arc::ptr_eq(&bus, &kernel));
        assert!(Arc::ptr_eq(&other, plan.router.default.as_ref().unwrap()));
        assert!(tmp.path().join("logs").is_dir());
    }

    #[test]
    fn sections_without_files_only_affect_console() {
        let tmp = tempdir().unwrap();
        let mut cfg: LoggingConfig = HashMap::new();
        cfg.insert("default".into(), section("warn", "", ""));
        cfg.insert("evm_network".into(), section("debug", "", ""));

        let plan = plan(&cfg, tmp.path());
        assert!(plan.router.is_empty());
        assert!(!tmp.path().join("logs").exists());
    }

    #[test]
    fn rotating_sink_writes_to_disk() {
        let tmp = tempdir().unwrap();
        let writer = open_rotating(&section("info", "out/app.log", "info"), tmp.path()).unwrap();

        let mut sink = FileSink(writer);
        sink.write_all(b"{\"msg\":\"hello\"}\n").unwrap();
        sink.flush().unwrap();

        let written = std::fs::read_to_string(tmp.path().join("out/app.log")).unwrap();
        assert!(written.contains("hello"));
    }
}
