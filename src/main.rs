use clap::Parser;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use dtap_rust::config::Config;
use dtap_rust::error::{DaemonError, Result};
use dtap_rust::services::Supervisor;
use dtap_rust::utils;

#[derive(Parser, Debug)]
#[command(name = "dtapd")]
#[command(about = "Демон детекции двойного нажатия модификатора с сигналом по D-Bus")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "dtap.toml")]
    config: String,

    /// Режим сухого запуска (без записей в виртуальное устройство)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Инициализация системы логирования
    if let Err(e) = init_tracing(&args.log_level) {
        eprintln!("Не удалось инициализировать логирование: {}", e);
        std::process::exit(1);
    }

    info!("Запуск dtapd v{}", env!("CARGO_PKG_VERSION"));

    // Коды выхода различимы для внешнего service manager: права доступа —
    // без перезапуска, потеря устройства или шины — перезапуск демона
    if let Err(e) = run(args).await {
        error!("Фатальная ошибка: {}", e);
        std::process::exit(e.exit_code());
    }

    info!("dtapd завершил работу");
}

async fn run(args: Args) -> Result<()> {
    // Конфигурация читается один раз; изменения требуют перезапуска
    let config = Arc::new(Config::load(&args.config)?);
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - записи в виртуальное устройство отключены");
    }

    // Проверка прав доступа
    utils::permissions::check_permissions()?;

    // Супервизор владеет шиной, виртуальным устройством и читателем
    let supervisor = Supervisor::new(config, args.dry_run).await?;
    info!("Все компоненты инициализированы");

    let mut daemon_handle = tokio::spawn(async move { supervisor.run().await });

    let mut sigterm = signal(SignalKind::terminate()).map_err(DaemonError::Io)?;

    tokio::select! {
        result = &mut daemon_handle => {
            // Контур детекции выходит только с ошибкой
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(DaemonError::Internal(format!("задача демона прервана: {}", e))),
            };
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Получен сигнал завершения (Ctrl+C)");
        }
        _ = sigterm.recv() => {
            info!("Получен SIGTERM");
        }
    }

    info!("Завершение работы...");

    // Прерываем задачу: Drop освобождает захват устройства и uinput
    daemon_handle.abort();

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    let shutdown_result = tokio::time::timeout(shutdown_timeout, async {
        let _ = daemon_handle.await;
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    Ok(())
}
