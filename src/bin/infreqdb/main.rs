use anyhow::Result;
use env_logger::{Builder, Env};

mod cli;
mod util;
mod cmd_build;
mod cmd_publish;
mod cmd_get;
mod cmd_info;
mod cmd_serve;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Build { out, json } =>
            cmd_build::exec(out, json),

        cli::Cmd::Publish { store, key, file } =>
            cmd_publish::exec(store, key, file),

        cli::Cmd::Get { store, key, bucket, lookup, json, out } =>
            cmd_get::exec(store, key, bucket, lookup, json, out),

        cli::Cmd::Info { store, key, json } =>
            cmd_info::exec(store, key, json),

        cli::Cmd::Serve { store, key, addr, threads } =>
            cmd_serve::exec(store, key, addr, threads),
    }
}
