use quarterd::{Config, run};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.get(1).map(String::as_str) == Some("init") {
        Config::create_default_if_missing()?;
        println!("✓ Config file created. Edit quarterd.toml and run again.");
        return Ok(());
    }

    let config = Config::load()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}
