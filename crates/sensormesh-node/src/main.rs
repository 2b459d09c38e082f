use std::path::PathBuf;

use clap::Parser;

use sensormesh_node::{FileStore, MonotonicClock, Node, NodeConfig, NodeOptions};
use sensormesh_radio::UdpTransport;

#[derive(Parser)]
#[command(name = "sensormesh-node", about = "Sensormesh wireless sensor network node")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/sensormesh/config.toml")]
    config: PathBuf,
}

/// Exit code asking the supervisor to restart us (reset command or a
/// completed firmware update).
const EXIT_REBOOT: i32 = 75;

fn main() {
    let cli = Cli::parse();

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        sensormesh_node::logging::init_json();
    } else {
        sensormesh_node::logging::init();
    }

    let config = match NodeConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    let options = NodeOptions {
        node_id: config.node.node_id(),
        repeater: config.node.repeater,
        parent: config.node.parent_id(),
    };

    let store = match config.storage.resolve().and_then(|path| FileStore::open(&path)) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("failed to open persistent store: {e}");
            std::process::exit(1);
        }
    };

    let transport = match UdpTransport::new(config.radio.group, config.radio.port, options.node_id)
    {
        Ok(transport) => transport,
        Err(e) => {
            tracing::error!("failed to open radio transport: {e}");
            std::process::exit(1);
        }
    };

    let mut node = Node::new(transport, store, MonotonicClock::new(), options);
    if config.serial.enabled_for(options.node_id) {
        match config.serial.open() {
            Ok(link) => node = node.with_serial(link),
            Err(e) => {
                tracing::error!("failed to open serial channel: {e}");
                std::process::exit(1);
            }
        }
    }

    node.begin(Some(Box::new(|frame| {
        tracing::info!(
            sender = frame.header.sender,
            message_type = ?frame.message_type(),
            "received"
        );
    })));

    loop {
        if !node.process() {
            // Nothing pending; yield briefly instead of spinning.
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        if node.reboot_pending() {
            tracing::info!("exiting for reboot");
            std::process::exit(EXIT_REBOOT);
        }
        if node.is_halted() {
            tracing::error!("node halted");
            std::process::exit(1);
        }
    }
}
