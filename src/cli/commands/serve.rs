//! Web server command.

use console::style;

use crate::config::Settings;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let (host, port) = match bind {
        Some(bind) => parse_bind_address(bind, &settings.host, settings.port)?,
        None => (settings.host.clone(), settings.port),
    };

    println!(
        "{} Writing PDFs to {}",
        style("→").cyan(),
        settings.output_dir.display()
    );
    println!(
        "{} Starting pdfbot server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3000" -> 127.0.0.1:3000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3000
/// - Host and port: "0.0.0.0:3000" -> 0.0.0.0:3000
///
/// Missing parts come from `default_host` and `default_port`.
fn parse_bind_address(
    bind: &str,
    default_host: &str,
    default_port: u16,
) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("Empty bind address");
    }

    // Try parsing as just a port number
    if let Ok(port) = bind.parse::<u16>() {
        return Ok((default_host.to_string(), port));
    }

    // Try parsing as host:port
    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
        if !host.contains(':') {
            anyhow::bail!("Invalid port in bind address: {}", bind);
        }
    }

    // Must be just a host, use default port
    Ok((bind.to_string(), default_port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(
            parse_bind_address("8080", "127.0.0.1", 3000).unwrap(),
            ("127.0.0.1".to_string(), 8080)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0", "127.0.0.1", 3000).unwrap(),
            ("0.0.0.0".to_string(), 3000)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0:4000", "127.0.0.1", 3000).unwrap(),
            ("0.0.0.0".to_string(), 4000)
        );
    }

    #[test]
    fn test_parse_bind_address_invalid_port() {
        assert!(parse_bind_address("localhost:http", "127.0.0.1", 3000).is_err());
        assert!(parse_bind_address("", "127.0.0.1", 3000).is_err());
    }
}
