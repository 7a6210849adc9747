use crate::error::{DeployError, DeployResult};

/// Default external port when the operator does not pick one.
pub const DEFAULT_PORT: u16 = 5000;

/// Check that `domain` is a plain DNS host name. The name ends up in
/// file paths and nginx directives, so anything else is rejected.
pub fn domain(domain: &str) -> DeployResult<()> {
    let invalid = || DeployError::InvalidDomain(domain.to_string());

    if domain.is_empty() || domain.len() > 253 {
        return Err(invalid());
    }

    for label in domain.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(invalid());
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid());
        }
        if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(invalid());
        }
    }

    Ok(())
}

/// Parse a TCP port given by the operator.
pub fn port(raw: &str) -> DeployResult<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(DeployError::InvalidPort(raw.to_string())),
        Ok(p) => Ok(p),
    }
}
