use std::fs::File;
use std::io::{stdin, stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use headband_osc::config::{self, ConfigSource, LogConfig};
use headband_osc::mqtt_publisher::spawn_mqtt_publisher;
use headband_osc::stdin_handler::spawn_stdin_handler;
use headband_osc::{console, OscServer, Result, Session};

fn main() {
    if let Err(err) = run() {
        log::error!("{}", err);
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(config: &LogConfig) -> Result<()> {
    // RUST_LOG overrides the configured level, e.g. RUST_LOG=headband_osc=debug
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.level));
    if let Some(path) = &config.file {
        builder.target(env_logger::Target::Pipe(Box::new(File::create(path)?)));
    }
    builder.init();
    Ok(())
}

/// Ask for the IP to listen on; an empty answer keeps the configured one.
fn prompt_host(default: &str) -> Result<String> {
    print!("Enter Computer IP Address [{}]: ", default);
    stdout().flush()?;
    let mut input = String::new();
    stdin().read_line(&mut input)?;
    let input = input.trim();
    Ok(if input.is_empty() { default.to_string() } else { input.to_string() })
}

fn run() -> Result<()> {
    let (config, source) = config::load_config(config::DEFAULT_CONFIG_PATH)?;
    init_logging(&config.log)?;
    match source {
        ConfigSource::File => log::info!("loaded configuration from {}", config::DEFAULT_CONFIG_PATH),
        ConfigSource::CreatedDefault => {
            log::info!("created default configuration at {}", config::DEFAULT_CONFIG_PATH);
            println!("Created default configuration file at {}", config::DEFAULT_CONFIG_PATH);
        }
        ConfigSource::UnsavedDefault => {
            log::warn!("could not write {}, using defaults", config::DEFAULT_CONFIG_PATH)
        }
    }

    let host = prompt_host(&config.osc.listening_host)?;
    println!("default port set to {}", config.osc.listening_port);
    let addr = config::parse_endpoint(&host, config.osc.listening_port)?;

    let exit_flag = Arc::new(AtomicBool::new(false));
    let exit_ctrlc = exit_flag.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        exit_ctrlc.store(true, Ordering::SeqCst);
    }) {
        log::warn!("could not install Ctrl-C handler: {}", e);
    }

    let mqtt = if config.mqtt.enabled {
        Some(spawn_mqtt_publisher(&config.mqtt, exit_flag.clone()))
    } else {
        None
    };
    let mqtt_tx = mqtt.as_ref().map(|(tx, _)| tx.clone());

    let print_raw = Arc::new(AtomicBool::new(config.print_raw));
    let print_raw_hook = print_raw.clone();

    let mut session = Session::new();
    session.on_cycle_complete(move |s| {
        let Some(snapshot) = s.snapshot() else {
            return;
        };
        console::print_snapshot(&snapshot);
        if print_raw_hook.load(Ordering::Relaxed) {
            console::print_raw(&s.raw_snapshot());
        }
        if let Some(tx) = &mqtt_tx {
            tx.send(snapshot);
        }
    });
    let session = Arc::new(session);

    let mut server = OscServer::new(addr, session.clone());
    let bound = server.start()?;
    console::print_listening(bound);
    console::print_quick_help();

    // Not joined: it stays blocked on stdin when shutdown comes from Ctrl-C
    let _stdin_handle = spawn_stdin_handler(session, exit_flag.clone(), print_raw);

    while !exit_flag.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    log::debug!("shutdown requested");
    server.stop();
    exit_flag.store(true, Ordering::SeqCst);
    if let Some((_, publisher)) = mqtt {
        let _ = publisher.join();
    }
    println!("Program End");
    Ok(())
}
