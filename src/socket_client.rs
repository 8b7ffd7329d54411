use crate::ipc::{socket_addr, socket_name, ControlCommand};
use anyhow::{Context, Result};
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::time::Duration;

/// Send a command to the daemon listening on the abstract socket `name`
pub fn send_command_to(name: &str, command: ControlCommand) -> Result<()> {
    let addr = socket_addr(name)?;

    let mut stream = UnixStream::connect_addr(&addr).with_context(|| {
        format!(
            "Failed to connect to daemon at @{}. Is the daemon running?",
            name
        )
    })?;

    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    stream
        .write_all(&[command.to_byte()])
        .with_context(|| format!("Failed to send `{}` to daemon", command))?;
    stream.flush()?;

    Ok(())
}

/// Send command to this user's daemon, exit with appropriate code
pub fn send_command_and_exit(command: ControlCommand) -> ! {
    match send_command_to(&socket_name(), command) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
