use anyhow::Result;
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing::{error, info};

use dtap_rust::protocol::{paste_sequence, Daemon1Proxy, BUS_NAME, SIGNAL_NAME};

/// Непривилегированная сторона границы: подписка на сигнал демона и
/// вызов метода инъекции через общий контракт шины. Этот процесс не
/// трогает /dev/input и /dev/uinput — вся привилегированная работа
/// остаётся в dtapd.
#[derive(Parser, Debug)]
#[command(name = "dtapctl")]
#[command(about = "Компаньон демона dtapd: слушатель сигнала и клиент инъекции")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Уровень логирования
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Слушать широковещательный сигнал и печатать каждое срабатывание
    Listen,
    /// Запросить инъекцию канонической последовательности вставки (Ctrl+V)
    Paste,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    let connection = zbus::Connection::session().await?;
    let proxy = Daemon1Proxy::new(&connection).await?;

    match args.command {
        Command::Listen => {
            let mut stream = proxy.receive_double_tapped().await?;
            info!("Подписка на {} от {}", SIGNAL_NAME, BUS_NAME);

            // Сигнал без полезной нагрузки: сам факт прихода — всё сообщение
            while let Some(_signal) = stream.next().await {
                info!("Двойное нажатие");
                println!("double-tap");
            }
        }
        Command::Paste => {
            // Вызов синхронный: успешный ответ означает, что записи в
            // виртуальное устройство сброшены и можно продолжать
            match proxy.inject_keys(&paste_sequence()).await {
                Ok(()) => info!("Вставка выполнена"),
                Err(e) => {
                    error!("Инъекция не удалась: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
