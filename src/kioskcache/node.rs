//! Master/slave role of a display node and the media path it should read.
//!
//! Operators configure the media folder as seen from the master machine,
//! usually a UNC share such as `\\CS1200-1\Pubblicita`. A slave reaches the
//! same share through the master's address, which is the database server it
//! is configured with, so the host part of a UNC path is swapped for it.

use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    Master,
    /// Carries the master's address.
    Slave(String),
}

impl NodeRole {
    pub fn from_server(server: &str) -> Self {
        let server = server.trim();
        if server.is_empty() || server.eq_ignore_ascii_case("localhost") || server == "127.0.0.1" {
            NodeRole::Master
        } else {
            NodeRole::Slave(server.to_string())
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Master => f.write_str("master"),
            NodeRole::Slave(addr) => write!(f, "slave of {}", addr),
        }
    }
}

/// The path this node should use for `media_path`. Only UNC paths on slaves
/// are rewritten; everything else is returned unchanged.
pub fn resolve_media_path(media_path: &str, role: &NodeRole) -> String {
    let NodeRole::Slave(master) = role else {
        return media_path.to_string();
    };
    let Some(rest) = media_path.strip_prefix(r"\\") else {
        return media_path.to_string();
    };
    let Some(sep) = rest.find('\\') else {
        return media_path.to_string();
    };
    if sep == 0 {
        return media_path.to_string();
    }

    let transformed = format!(r"\\{}{}", master, &rest[sep..]);
    info!(from = media_path, to = %transformed, "media path rewritten for slave");
    transformed
}
