use crate::error::{RadioError, Result};
use crate::station::Status;
use tracing::debug;

/// Print the name of every paired device that is currently connected.
const CONNECTED_DEVICES: &str = r#"bluetoothctl paired-devices |
cut -f2 -d' ' |
while read -r addr
do
    info=$(bluetoothctl info "$addr")
    if echo "$info" | grep -q "Connected: yes"; then
        echo "$info" | grep "Name" | cut -f2- -d' '
    fi
done
"#;

/// Report the connected source device's name in the show line.
pub async fn status() -> Result<Status> {
    let output = tokio::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(CONNECTED_DEVICES)
        .stdin(std::process::Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RadioError::Shell {
            command: "bluetoothctl".to_string(),
            message: stderr.trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    debug!("bluetooth status: {stdout:?}");
    Ok(parse(&stdout))
}

fn parse(stdout: &str) -> Status {
    let names: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    Status {
        show: names.join(", "),
        ..Status::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_names() {
        assert_eq!(parse("Pixel 7\n").show, "Pixel 7");
        assert_eq!(parse("Pixel 7\n\niPad\n").show, "Pixel 7, iPad");
        assert_eq!(parse("").show, "");
    }
}
