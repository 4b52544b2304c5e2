use std::io::Write;

use clap::Parser;
use http_body_util::BodyExt;
use paranoid::{
    cli::{Args, ClientLoader},
    error::ParanoidError,
};

#[tokio::main]
async fn main() -> Result<(), ParanoidError> {
    env_logger::init();

    let args = Args::parse();

    let client = ClientLoader::load(&args)?.build()?;
    let response = client.get(&args.url).await?;

    println!("{:?} {}", response.version(), response.status());
    let body = response.into_body().collect().await?.to_bytes();

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&body)?;
    stdout.flush()?;

    Ok(())
}
