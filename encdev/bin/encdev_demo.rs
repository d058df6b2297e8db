//! encdev demo
//!
//! Registers a 16-byte device range, fills minor 3 with 0xFF, then reads it
//! back through the cipher with key 0x0F.

use encdev::control::{IOCTL_OP_ENCRYPT, IOCTL_OP_GETMAJOR, IOCTL_OP_REWIND, IOCTL_OP_SETKEY};
use encdev::{DeviceConfig, DeviceHost, IdGen, Minor};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = DeviceConfig::with_capacity(16)?;
    let host = DeviceHost::register(config, Arc::new(IdGen::new()))?;
    let client = host.client();
    let runner = tokio::spawn(host.run());

    let fd = client.open(Minor::new(3)).await?;
    let major = client.control(fd, IOCTL_OP_GETMAJOR, 0).await?;
    println!("major: {major}");

    let written = client.write(fd, &[0xFF; 16]).await?;
    println!("wrote {written} bytes");
    let written = client.write(fd, &[0x00]).await?;
    println!("wrote {written} bytes (buffer full)");

    client.control(fd, IOCTL_OP_REWIND, 0).await?;
    client.control(fd, IOCTL_OP_SETKEY, 0x0F).await?;
    client.control(fd, IOCTL_OP_ENCRYPT, 1).await?;

    let data = client.read(fd, 16).await?;
    let hex: Vec<String> = data.iter().map(|b| format!("{b:02x}")).collect();
    println!("read {} bytes: {}", data.len(), hex.join(" "));

    if let Err(e) = client.control(fd, IOCTL_OP_ENCRYPT, 2).await {
        println!("cipher flag 2 rejected: {e} (errno {})", e.errno());
    }

    client.close(fd).await?;
    drop(client);
    runner.await?;
    Ok(())
}
