use clap::Parser;
use testpulse_http::serve;

#[derive(Parser)]
#[command(name = "testpulse", about = "Active content test reporting service")]
struct Cli {
    #[arg(long, env = "TESTPULSE_DATA_DIR", default_value = "./data")]
    data_dir: String,
    #[arg(long, env = "TESTPULSE_BIND_ADDR")]
    bind_addr: Option<String>,
    #[arg(long, env = "TESTPULSE_PORT")]
    port: Option<u16>,
}

fn resolve_bind_addr(cli: &Cli) -> String {
    if let Some(bind_addr) = &cli.bind_addr {
        return bind_addr.clone();
    }
    let port = cli.port.unwrap_or(7800);
    format!("127.0.0.1:{port}")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    std::env::set_var("TESTPULSE_DATA_DIR", &cli.data_dir);
    std::env::set_var("TESTPULSE_BIND_ADDR", resolve_bind_addr(&cli));
    serve().await
}
