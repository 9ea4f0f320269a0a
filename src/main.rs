use clap::{Args, Parser, Subcommand};
use serialport::SerialPortType;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uart_term::config::{Config, ConfigLoader, LogFormat, LoggingConfig};
use uart_term::{ListenerState, Message, MessageLog, SerialSession, SessionError, SessionResult};

/// Open or configure failure.
const EXIT_OPEN: u8 = 1;
/// Transmit failure.
const EXIT_TRANSMIT: u8 = 2;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "uart-term",
    version,
    about = "Talk to a serial (UART) device: send text, watch what comes back.",
    long_about = "Opens a serial character device, applies a line configuration, transmits text and records everything received by a background listener. Logs go to stderr; message traffic goes to stdout."
)]
struct Cli {
    /// Configuration file (skips the usual search).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "uart_term=trace". Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial devices on this machine.
    Ports {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Send one line, listen for replies, print the exchange.
    Send(SendArgs),
    /// Send each stdin line and print received data until EOF or Ctrl+C.
    Monitor(MonitorArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Device path or configured alias.
    device: String,
    /// Baud rate.
    baud: u32,
    /// Text to send; a newline is appended.
    message: String,
    /// How long to listen for replies after sending, in milliseconds.
    #[arg(long, default_value_t = 500)]
    listen_ms: u64,
    /// Print the message log as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Device path or configured alias. Defaults to `[serial] default_device`.
    device: Option<String>,
    /// Baud rate. Defaults to `[serial] baud_rate`.
    #[arg(short, long)]
    baud: Option<u32>,
    /// Print messages as JSON lines.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let loader = match loaded {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&loader.config().logging, cli.log_level.as_deref());
    if let Some(path) = &loader.config_path {
        info!(path = %path.display(), "loaded configuration");
    }
    let config = loader.into_config();

    match cli.command {
        Command::Ports { json } => list_ports(json),
        Command::Send(args) => run_send(&config, args).await,
        Command::Monitor(args) => run_monitor(&config, args).await,
    }
}

fn init_tracing(logging: &LoggingConfig, level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&logging.level)),
    }
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn list_ports(json: bool) -> ExitCode {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            eprintln!("error: could not enumerate serial ports: {e}");
            return ExitCode::FAILURE;
        }
    };

    if json {
        let list: Vec<_> = ports
            .iter()
            .map(|p| serde_json::json!({ "name": p.port_name, "type": describe(&p.port_type) }))
            .collect();
        println!("{}", serde_json::Value::Array(list));
    } else if ports.is_empty() {
        eprintln!("No serial ports found.");
    } else {
        for port in &ports {
            println!("{:<24} {}", port.port_name, describe(&port.port_type));
        }
    }
    ExitCode::SUCCESS
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut s = format!("usb {:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(product) = usb.product.as_ref().or(usb.manufacturer.as_ref()) {
                s.push(' ');
                s.push_str(product);
            }
            s
        }
        SerialPortType::PciPort => "pci".to_string(),
        SerialPortType::BluetoothPort => "bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

async fn run_send(config: &Config, args: SendArgs) -> ExitCode {
    let line = config
        .serial
        .connection(&args.device)
        .with_baud_rate(args.baud);
    let log = MessageLog::new();

    let mut session = match SerialSession::open(line, log.clone()) {
        Ok(session) => session,
        Err(e) => return fail(&e, EXIT_OPEN),
    };
    if let Err(e) = session.start_listener(config.serial.listener_options()) {
        return fail(&e, EXIT_OPEN);
    }

    let sent = send_line(&session, &args.message);
    if sent.is_ok() {
        tokio::time::sleep(Duration::from_millis(args.listen_ms)).await;
    }
    let exit = tokio::task::block_in_place(|| session.close());

    print_messages(&log.snapshot(), args.json);

    if let Err(e) = sent {
        return fail(&e, EXIT_TRANSMIT);
    }
    if let Some(exit) = exit.filter(|e| e.is_failure()) {
        eprintln!("warning: {exit}");
    }
    ExitCode::SUCCESS
}

async fn run_monitor(config: &Config, args: MonitorArgs) -> ExitCode {
    let Some(device) = args
        .device
        .or_else(|| config.serial.default_device.clone())
    else {
        eprintln!("error: no device given and no [serial] default_device configured");
        return ExitCode::FAILURE;
    };
    let mut line = config.serial.connection(&device);
    if let Some(baud) = args.baud {
        line.baud_rate = baud;
    }
    let log = MessageLog::new();

    let mut session = match SerialSession::open(line, log.clone()) {
        Ok(session) => session,
        Err(e) => return fail(&e, EXIT_OPEN),
    };
    if let Err(e) = session.start_listener(config.serial.listener_options()) {
        return fail(&e, EXIT_OPEN);
    }
    eprintln!(
        "Connected to {} at {} baud. Ctrl+C or end of input to quit.",
        session.device_path(),
        session.settings().baud_rate
    );

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(Duration::from_millis(50));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut cursor = 0;

    let code = loop {
        tokio::select! {
            _ = &mut shutdown => break ExitCode::SUCCESS,
            input = stdin.next_line() => match input {
                Ok(Some(text)) => {
                    if let Err(e) = send_line(&session, &text) {
                        eprintln!("error: {e}");
                        if e.is_fatal() {
                            break ExitCode::from(EXIT_TRANSMIT);
                        }
                    }
                }
                Ok(None) => break ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: reading input: {e}");
                    break ExitCode::FAILURE;
                }
            },
            _ = tick.tick() => {
                cursor = print_new(&log, cursor, args.json);
                if session.listener_state() == ListenerState::Terminated {
                    if let Some(failure) = session.receive_failure() {
                        eprintln!("error: {failure}");
                    }
                    break ExitCode::FAILURE;
                }
            }
        }
    };

    tokio::task::block_in_place(|| session.close());
    print_new(&log, cursor, args.json);
    code
}

/// Transmit off the async workers; the listener may hold the port for up to
/// one read timeout.
fn send_line(session: &SerialSession, text: &str) -> SessionResult<usize> {
    tokio::task::block_in_place(|| session.send_line(text))
}

fn fail(err: &SessionError, code: u8) -> ExitCode {
    eprintln!("error: {err} ({})", err.kind());
    ExitCode::from(code)
}

/// Print messages logged since `cursor` and return the next cursor.
fn print_new(log: &MessageLog, cursor: u64, json: bool) -> u64 {
    let fresh = log.since(cursor);
    for message in &fresh {
        print_message(message, json);
    }
    fresh.last().map_or(cursor, |m| m.sequence + 1)
}

fn print_messages(messages: &[Message], json: bool) {
    if json {
        match serde_json::to_string_pretty(messages) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("error: could not encode messages: {e}"),
        }
        return;
    }
    for message in messages {
        print_message(message, false);
    }
}

fn print_message(message: &Message, json: bool) {
    if json {
        match serde_json::to_string(message) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("error: could not encode message: {e}"),
        }
        return;
    }
    let text = message.text_lossy();
    println!(
        "{} {} {}",
        message.timestamp.format("%H:%M:%S%.3f"),
        message.direction,
        text.trim_end_matches(['\r', '\n'])
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uart_term::{ListenerOptions, MockSerialPort, PortHandle, SerialConfiguration};

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn sends_do_not_stall_other_tasks() {
        let mock = MockSerialPort::new("MOCK0");
        let mut session = SerialSession::with_handle(
            PortHandle::from_adapter(mock.clone()),
            SerialConfiguration::new("MOCK0").with_read_timeout_ds(1),
            MessageLog::new(),
        )
        .unwrap();
        session.start_listener(ListenerOptions::default()).unwrap();

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Shares the single worker with the ticker and never awaits, so the
        // ticker only advances if each send hands the worker back.
        let observed = Arc::clone(&ticks);
        let sender = tokio::spawn(async move {
            let before = observed.load(Ordering::SeqCst);
            for i in 0..5 {
                // Let the listener take the port back so the send must wait.
                std::thread::sleep(Duration::from_millis(2));
                send_line(&session, &format!("line {i}")).unwrap();
            }
            let during = observed.load(Ordering::SeqCst) - before;
            tokio::task::block_in_place(|| session.close());
            during
        });

        let during = sender.await.unwrap();
        ticker.abort();
        assert!(during > 0, "ticker made no progress while sends waited");
        assert_eq!(mock.get_write_log().len(), 5);
    }
}
